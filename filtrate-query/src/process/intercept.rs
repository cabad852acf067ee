//! Per-field value interception.

use std::sync::Arc;

use crate::error::QueryResult;
use crate::options::{InterceptorSpec, Policy};
use crate::value::Value;

/// Run the interceptor configured for `field`, if any.
///
/// Without an interceptor the value is returned unchanged. Errors raised by
/// the interceptor are returned as-is.
pub async fn intercept(field: &str, value: Value, policy: &Arc<Policy>) -> QueryResult<Value> {
    match policy.interceptor(field) {
        None => Ok(value),
        Some(InterceptorSpec::Sync(f)) => {
            tracing::trace!(field, "intercepting value");
            f(value, policy)
        }
        Some(InterceptorSpec::Async(f)) => {
            tracing::trace!(field, "intercepting value (async)");
            f(value, Arc::clone(policy)).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, QueryError};
    use crate::options::FilterOptions;

    fn policy(options: FilterOptions) -> Arc<Policy> {
        Arc::new(options.validate().unwrap())
    }

    #[tokio::test]
    async fn test_no_interceptor_passes_through() {
        let policy = policy(FilterOptions::new());
        let value = intercept("first", Value::from("Bob"), &policy).await.unwrap();
        assert_eq!(value, Value::from("Bob"));
    }

    #[tokio::test]
    async fn test_sync_interceptor() {
        let policy = policy(FilterOptions::new().interceptor("first", |value, _| {
            Ok(value.as_str().map(str::to_lowercase).map(Value::from).unwrap_or(value))
        }));
        let value = intercept("first", Value::from("Bob"), &policy).await.unwrap();
        assert_eq!(value, Value::from("bob"));

        let other = intercept("last", Value::from("Smith"), &policy).await.unwrap();
        assert_eq!(other, Value::from("Smith"));
    }

    #[tokio::test]
    async fn test_async_interceptor_sees_policy() {
        let policy = policy(FilterOptions::new().whitelist(["age"]).interceptor_async(
            "age",
            |value, policy| async move {
                tokio::task::yield_now().await;
                let bump = if policy.should_whitelist() { 1 } else { 0 };
                Ok(Value::Int(value.as_i64().unwrap_or_default() + bump))
            },
        ));
        let value = intercept("age", Value::Int(20), &policy).await.unwrap();
        assert_eq!(value, Value::Int(21));
    }

    #[tokio::test]
    async fn test_interceptor_error_propagates() {
        let policy = policy(
            FilterOptions::new()
                .interceptor("age", |_, _| Err(QueryError::bad_request("age must be a number"))),
        );
        let err = intercept("age", Value::from("x"), &policy).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Rejected);
        assert_eq!(err.detail(), "age must be a number");
    }
}
