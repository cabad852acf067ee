//! Shape dispatch for a field's value.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};

use super::{BRANCH_CONCURRENCY, check_depth, intercept, normalize_expression};
use crate::error::QueryResult;
use crate::options::{BoxFuture, Policy};
use crate::value::Value;

/// Process the value of `field`.
///
/// Maps are modifier expressions and go through [`normalize_expression`].
/// Lists are processed element by element, preserving order. Anything else
/// is a terminal value and goes through the field's interceptor.
pub fn process_expression<'a>(
    field: &'a str,
    expression: &'a Value,
    policy: &'a Arc<Policy>,
    depth: usize,
) -> BoxFuture<'a, QueryResult<Value>> {
    Box::pin(async move {
        match expression {
            Value::Map(modifiers) => normalize_expression(field, modifiers, policy, depth).await,
            Value::List(items) => {
                check_depth(depth, policy)?;
                let pending: Vec<_> = items
                    .iter()
                    .map(|item| process_expression(field, item, policy, depth + 1))
                    .collect();
                let processed: Vec<Value> = stream::iter(pending)
                    .buffered(BRANCH_CONCURRENCY)
                    .try_collect()
                    .await?;
                Ok(Value::List(processed))
            }
            terminal => intercept(field, terminal.clone(), policy).await,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::options::FilterOptions;
    use pretty_assertions::assert_eq;

    fn policy(options: FilterOptions) -> Arc<Policy> {
        Arc::new(options.validate().unwrap())
    }

    #[tokio::test]
    async fn test_terminal_values_are_intercepted() {
        let policy = policy(FilterOptions::new().interceptor("tag", |value, _| {
            Ok(Value::from(format!("#{}", value.as_str().unwrap_or_default())))
        }));
        let list = Value::from(vec!["a", "b"]);
        let out = process_expression("tag", &list, &policy, 1).await.unwrap();
        assert_eq!(out, Value::from(vec!["#a", "#b"]));
    }

    #[tokio::test]
    async fn test_maps_are_normalized() {
        let policy = policy(FilterOptions::new().allow("$gte"));
        let expression = Value::map([("$gte", 21)]);
        let out = process_expression("age", &expression, &policy, 1).await.unwrap();
        assert_eq!(out, expression);
    }

    #[tokio::test]
    async fn test_deep_lists_hit_the_nesting_limit() {
        let policy = policy(FilterOptions::new().max_depth(4));
        let mut value = Value::Int(1);
        for _ in 0..8 {
            value = Value::List(vec![value]);
        }
        let err = process_expression("x", &value, &policy, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NestingTooDeep);
    }
}
