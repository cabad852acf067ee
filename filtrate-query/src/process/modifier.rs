//! Modifier expression normalization.

use std::sync::Arc;

use super::{check_depth, process_expression};
use crate::error::{QueryError, QueryResult};
use crate::options::{BoxFuture, ModifierSpec, Policy};
use crate::value::{Map, Value};

/// Normalize a modifier expression such as `{"$gte": 21, "$lt": 65}`.
///
/// Modifiers are applied in key order. Each operand is processed first
/// (nested expressions, lists and interceptors), then handed to the
/// modifier:
///
/// - `Allow` stores the operand under the modifier name;
/// - `Transform` calls the caller's function; a map result is merged into
///   the output, any other result replaces the output entirely;
/// - `Malformed` is a server error;
/// - absent or `Forbid` is a bad request.
///
/// Once a transform has replaced the output with a non-map value, later
/// modifiers are still checked and run, but have nothing to merge into.
pub fn normalize_expression<'a>(
    field: &'a str,
    expression: &'a Map,
    policy: &'a Arc<Policy>,
    depth: usize,
) -> BoxFuture<'a, QueryResult<Value>> {
    Box::pin(async move {
        check_depth(depth, policy)?;

        let mut normalized = Value::Map(Map::with_capacity(expression.len()));

        for (name, operand) in expression {
            let processed = || process_expression(field, operand, policy, depth + 1);

            match policy.modifier(name) {
                None | Some(ModifierSpec::Forbid) => {
                    tracing::debug!(field, modifier = %name, "rejecting modifier");
                    return Err(QueryError::forbidden_modifier(name.as_str()).with_field(field));
                }
                Some(ModifierSpec::Allow) => {
                    let processed = processed().await?;
                    tracing::trace!(field, modifier = %name, "applying modifier");
                    if let Value::Map(out) = &mut normalized {
                        out.insert(name.clone(), processed);
                    }
                }
                Some(ModifierSpec::Transform(transform)) => {
                    let processed = processed().await?;
                    tracing::trace!(field, modifier = %name, "applying modifier");
                    match transform(field.to_string(), processed).await? {
                        Value::Map(entries) => {
                            if let Value::Map(out) = &mut normalized {
                                out.extend(entries);
                            }
                        }
                        bare => normalized = bare,
                    }
                }
                Some(ModifierSpec::Malformed(definition)) => {
                    processed().await?;
                    tracing::warn!(
                        modifier = %name,
                        definition = %definition,
                        "modifier is configured with an unusable definition"
                    );
                    return Err(QueryError::invalid_modifier(name.as_str()).with_field(field));
                }
            }
        }

        Ok(normalized)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::options::FilterOptions;
    use crate::value::Pattern;
    use pretty_assertions::assert_eq;

    fn policy(options: FilterOptions) -> Arc<Policy> {
        Arc::new(options.validate().unwrap())
    }

    fn expression(value: Value) -> Map {
        value.as_map().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_allowed_modifiers_pass_through() {
        let policy = policy(FilterOptions::new().allow("$gte").allow("$lt"));
        let input = expression(Value::map([("$gte", 100000), ("$lt", 200000)]));
        let out = normalize_expression("balance", &input, &policy, 1).await.unwrap();
        assert_eq!(out, Value::Map(input));
    }

    #[tokio::test]
    async fn test_undefined_and_forbidden_modifiers() {
        let policy = policy(FilterOptions::new().forbid("$where"));

        let err = normalize_expression("a", &expression(Value::map([("$where", 1)])), &policy, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ForbiddenModifier);
        assert_eq!(err.detail(), "Undefined/Forbidden modifier found in query filter: $where");

        let err = normalize_expression("a", &expression(Value::map([("$nope", 1)])), &policy, 1)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(err.context.modifier.as_deref(), Some("$nope"));
    }

    #[tokio::test]
    async fn test_malformed_modifier_is_server_error() {
        let policy = policy(
            FilterOptions::new().modifier("$foo", ModifierSpec::Malformed("\"bar\"".into())),
        );
        let err = normalize_expression("a", &expression(Value::map([("$foo", 1)])), &policy, 1)
            .await
            .unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(
            err.detail(),
            "Invalid modifier defined for '$foo', must be a boolean or a function"
        );
    }

    #[tokio::test]
    async fn test_policy_rejection_precedes_operand_errors() {
        let failing = |options: FilterOptions| {
            policy(options.interceptor("a", |_, _| Err(QueryError::bad_request("bad operand"))))
        };

        let forbidden = failing(FilterOptions::new().forbid("$where"));
        let err = normalize_expression("a", &expression(Value::map([("$where", 1)])), &forbidden, 1)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ForbiddenModifier);

        let malformed =
            failing(FilterOptions::new().modifier("$foo", ModifierSpec::Malformed("3".into())));
        let err = normalize_expression("a", &expression(Value::map([("$foo", 1)])), &malformed, 1)
            .await
            .unwrap_err();
        assert_eq!(err.detail(), "bad operand");
    }

    #[tokio::test]
    async fn test_transform_map_result_is_merged() {
        let policy = policy(FilterOptions::new().allow("$lt").modifier_fn("$startsWith", |_, v| {
            let pattern = Pattern::new(&format!("^{}", v.as_str().unwrap_or_default()))
                .map_err(|e| QueryError::bad_request(e.to_string()))?;
            Ok(Value::map([("$regex", Value::Regex(pattern))]))
        }));
        let input = expression(Value::map([
            ("$startsWith", Value::from("bo")),
            ("$lt", Value::from("c")),
        ]));
        let out = normalize_expression("first", &input, &policy, 1).await.unwrap();
        assert_eq!(
            out,
            Value::map([
                ("$regex", Value::Regex(Pattern::new("^bo").unwrap())),
                ("$lt", Value::from("c")),
            ])
        );
    }

    #[tokio::test]
    async fn test_transform_bare_result_replaces_output() {
        let policy = policy(
            FilterOptions::new()
                .allow("$gte")
                .modifier_fn("$eq", |_, v| Ok(v))
                .allow("$lt"),
        );
        let input = expression(Value::map([
            ("$gte", Value::Int(1)),
            ("$eq", Value::Int(5)),
            ("$lt", Value::Int(9)),
        ]));
        let out = normalize_expression("n", &input, &policy, 1).await.unwrap();
        assert_eq!(out, Value::Int(5));

        let input = expression(Value::map([("$eq", Value::Int(5)), ("$bad", Value::Int(9))]));
        let err = normalize_expression("n", &input, &policy, 1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ForbiddenModifier);
    }

    #[tokio::test]
    async fn test_operand_is_intercepted_before_transform() {
        let policy = policy(
            FilterOptions::new()
                .interceptor("first", |v, _| {
                    Ok(Value::from(v.as_str().unwrap_or_default().to_lowercase()))
                })
                .modifier_async("$startsWith", |field, v| async move {
                    assert_eq!(field, "first");
                    Ok(Value::map([("$prefix", v)]))
                }),
        );
        let input = expression(Value::map([("$startsWith", "Bob")]));
        let out = normalize_expression("first", &input, &policy, 1).await.unwrap();
        assert_eq!(out, Value::map([("$prefix", "bob")]));
    }

    #[tokio::test]
    async fn test_nested_expression_is_normalized_first() {
        let policy = policy(FilterOptions::new().allow("$not").allow("$gt"));
        let input = expression(Value::map([("$not", Value::map([("$gt", 3)]))]));
        let out = normalize_expression("n", &input, &policy, 1).await.unwrap();
        assert_eq!(out, Value::Map(input.clone()));

        let input = expression(Value::map([("$not", Value::map([("$bad", 3)]))]));
        assert!(normalize_expression("n", &input, &policy, 1).await.is_err());
    }

    #[tokio::test]
    async fn test_transform_error_propagates_unchanged() {
        let policy = policy(FilterOptions::new().modifier_fn("$near", |_, _| {
            Err(QueryError::server_error("geo index unavailable"))
        }));
        let input = expression(Value::map([("$near", Value::from(vec![1.0, 2.0]))]));
        let err = normalize_expression("loc", &input, &policy, 1).await.unwrap_err();
        assert_eq!(err.status(), 500);
        assert_eq!(err.detail(), "geo index unavailable");
    }
}
