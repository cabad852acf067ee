//! Clause normalization: the entry point of the engine.

use std::sync::Arc;

use futures::{StreamExt, TryStreamExt, stream};
use tracing::{debug, trace};

use super::{BRANCH_CONCURRENCY, check_depth, process_expression};
use crate::error::{QueryError, QueryResult};
use crate::options::{BoxFuture, Policy};
use crate::value::{Map, Value};

/// Normalize a clause into a fresh map.
///
/// For each field, in key order:
///
/// 1. a blacklisted field is rejected, logical operators included;
/// 2. a logical operator must hold a list, and each element is normalized
///    as a clause (logical operators are exempt from the whitelist);
/// 3. a field outside an active whitelist is rejected;
/// 4. the value is processed as an expression, then passed through the
///    post-normalization hook if one is configured;
/// 5. the output key is the field name after every field mapper; two
///    fields that map onto the same key are rejected.
///
/// The first error aborts the whole clause. Sibling fields are handled in
/// order; the branches of a logical operator run concurrently but report
/// the first failing branch by position.
pub fn normalize_clause<'a>(
    clause: &'a Value,
    policy: &'a Arc<Policy>,
    depth: usize,
) -> BoxFuture<'a, QueryResult<Map>> {
    Box::pin(async move {
        let Value::Map(fields) = clause else {
            return Err(QueryError::not_a_clause(clause.kind()));
        };
        check_depth(depth, policy)?;
        tokio::task::yield_now().await;

        let mut normalized = Map::with_capacity(fields.len());

        for (field, value) in fields {
            if policy.is_blacklisted(field) {
                debug!(field = %field, "field is blacklisted");
                return Err(QueryError::forbidden_field(field.as_str()));
            }

            if policy.is_logical_operator(field) {
                let Value::List(branches) = value else {
                    return Err(QueryError::logical_operator_requires_array(field.as_str()));
                };
                trace!(
                    operator = %field,
                    branches = branches.len(),
                    "normalizing logical operator"
                );
                let branches = normalize_branches(branches, policy, depth + 1).await?;
                normalized.insert(field.clone(), Value::List(branches));
                continue;
            }

            if policy.is_not_whitelisted(field) {
                debug!(field = %field, "field is not whitelisted");
                return Err(QueryError::forbidden_field(field.as_str()));
            }

            trace!(field = %field, "normalizing field");
            let mut expression = process_expression(field, value, policy, depth + 1).await?;
            if let Some(hook) = policy.post_interceptor() {
                expression = hook.call(field, expression, Arc::clone(policy)).await?;
            }

            let key = policy.map_field(field);
            if normalized.contains_key(&key) {
                debug!(field = %field, key = %key, "renamed field collides");
                return Err(QueryError::conflicting_field(field.as_str(), key));
            }
            normalized.insert(key, expression);
        }

        Ok(normalized)
    })
}

async fn normalize_branches(
    branches: &[Value],
    policy: &Arc<Policy>,
    depth: usize,
) -> QueryResult<Vec<Value>> {
    let pending: Vec<_> = branches
        .iter()
        .map(|branch| normalize_clause(branch, policy, depth))
        .collect();

    stream::iter(pending)
        .buffered(BRANCH_CONCURRENCY)
        .map_ok(Value::Map)
        .try_collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::options::{FieldMapper, FilterOptions};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn policy(options: FilterOptions) -> Arc<Policy> {
        Arc::new(options.validate().unwrap())
    }

    #[tokio::test]
    async fn test_rejects_non_clause() {
        let policy = policy(FilterOptions::new());
        let err = normalize_clause(&Value::from(vec![1, 2]), &policy, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAClause);
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_empty_clause() {
        let policy = policy(FilterOptions::new());
        let out = normalize_clause(&Value::Map(Map::new()), &policy, 1).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_logical_operator_requires_list() {
        let policy = policy(FilterOptions::new());
        let clause = Value::map([("$or", Value::map([("a", 1)]))]);
        let err = normalize_clause(&clause, &policy, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidLogicalOperator);
        assert_eq!(err.detail(), "Logical operator '$or' requires an array value");
    }

    #[tokio::test]
    async fn test_logical_operators_skip_whitelist_but_not_blacklist() {
        let clause = Value::map([("$or", Value::List(vec![Value::map([("age", 1)])]))]);

        let whitelisted = policy(FilterOptions::new().whitelist(["age"]));
        let out = normalize_clause(&clause, &whitelisted, 1).await.unwrap();
        assert_eq!(Value::Map(out), clause);

        let blacklisted = policy(FilterOptions::new().blacklist(["$or"]));
        let err = normalize_clause(&clause, &blacklisted, 1).await.unwrap_err();
        assert_eq!(err.detail(), "Forbidden field provided in query filter: $or");
    }

    #[tokio::test]
    async fn test_first_failing_branch_wins() {
        let policy = policy(
            FilterOptions::new()
                .allow("$gte")
                .interceptor_async("slow", |_, _| async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Err(QueryError::bad_request("slow branch failed"))
                }),
        );
        let clause = Value::map([(
            "$and",
            Value::List(vec![
                Value::map([("ok", Value::map([("$gte", 1)]))]),
                Value::map([("slow", 1)]),
                Value::map([("fast", Value::map([("$nope", 1)]))]),
            ]),
        )]);
        let err = normalize_clause(&clause, &policy, 1).await.unwrap_err();
        assert_eq!(err.detail(), "slow branch failed");
    }

    #[tokio::test]
    async fn test_branch_order_is_preserved() {
        let policy = policy(FilterOptions::new().interceptor_async("n", |v, _| async move {
            let n = v.as_i64().unwrap_or_default();
            tokio::time::sleep(Duration::from_millis((5 - n) as u64 * 5)).await;
            Ok(v)
        }));
        let branches: Vec<Value> = (1..=4).map(|n| Value::map([("n", n)])).collect();
        let clause = Value::map([("$or", Value::List(branches.clone()))]);
        let out = normalize_clause(&clause, &policy, 1).await.unwrap();
        assert_eq!(out["$or"], Value::List(branches));
    }

    #[tokio::test]
    async fn test_map_fields_rename_output_only() {
        let policy = policy(
            FilterOptions::new()
                .whitelist(["first"])
                .interceptor("first", |v, _| {
                    Ok(Value::from(format!("{}!", v.as_str().unwrap_or_default())))
                })
                .map_field(FieldMapper::table([("first", "first_name")])),
        );
        let clause = Value::map([(
            "$or",
            Value::List(vec![Value::map([("first", "bob")])]),
        )]);
        let out = normalize_clause(&clause, &policy, 1).await.unwrap();
        assert_eq!(
            Value::Map(out),
            Value::map([("$or", Value::List(vec![Value::map([("first_name", "bob!")])]))])
        );
    }

    #[tokio::test]
    async fn test_map_fields_collision_is_rejected() {
        let policy = policy(
            FilterOptions::new()
                .allow("$gte")
                .allow("$lt")
                .map_field(FieldMapper::table([("age", "years")])),
        );
        let clause = Value::map([
            ("age", Value::map([("$gte", 21)])),
            ("years", Value::map([("$lt", 65)])),
        ]);
        let err = normalize_clause(&clause, &policy, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ForbiddenField);
        assert_eq!(err.status(), 400);
        assert_eq!(
            err.detail(),
            "Forbidden field provided in query filter: years maps onto an existing field years"
        );
    }

    #[tokio::test]
    async fn test_post_intercept_error_aborts_clause() {
        let policy = policy(FilterOptions::new().intercept_normalized(|field, value, _| {
            if field == "b" {
                Err(QueryError::bad_request("b is not searchable"))
            } else {
                Ok(value)
            }
        }));
        let clause = Value::map([("a", 1), ("b", 2), ("c", 3)]);
        let err = normalize_clause(&clause, &policy, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Rejected);
        assert_eq!(err.detail(), "b is not searchable");
    }

    #[tokio::test]
    async fn test_async_post_intercept_is_awaited() {
        let policy = policy(FilterOptions::new().intercept_normalized_async(
            |field, value, _| async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok(Value::map([(field, value)]))
            },
        ));
        let out = normalize_clause(&Value::map([("a", 1)]), &policy, 1).await.unwrap();
        assert_eq!(out["a"], Value::map([("a", 1)]));
    }

    #[tokio::test]
    async fn test_post_intercept_skips_logical_operators() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let policy = policy(FilterOptions::new().intercept_normalized(move |field, value, _| {
            recorder.lock().unwrap().push(field.to_string());
            Ok(value)
        }));
        let clause = Value::map([(
            "$or",
            Value::List(vec![Value::map([("a", 1)]), Value::map([("b", 2)])]),
        )]);
        let out = normalize_clause(&clause, &policy, 1).await.unwrap();
        assert_eq!(Value::Map(out), clause);
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_nesting_limit() {
        let policy = policy(FilterOptions::new().max_depth(5).allow("$gte"));
        let mut clause = Value::map([("a", Value::map([("$gte", 1)]))]);
        for _ in 0..5 {
            clause = Value::map([("$and", Value::List(vec![clause]))]);
        }
        let err = normalize_clause(&clause, &policy, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NestingTooDeep);
        assert_eq!(err.status(), 400);
    }

    #[tokio::test]
    async fn test_input_is_untouched() {
        let policy = policy(FilterOptions::new().interceptor("a", |_, _| Ok(Value::Null)));
        let clause = Value::map([("a", 1)]);
        let before = clause.clone();
        let out = normalize_clause(&clause, &policy, 1).await.unwrap();
        assert_eq!(clause, before);
        assert_eq!(out["a"], Value::Null);
    }
}
