//! Caller-supplied transforms: modifiers, interceptors and field mappers.
//!
//! Whether a callable runs synchronously or asynchronously is chosen by the
//! constructor the configuration author uses, never inferred at runtime.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::future;

use super::Policy;
use crate::error::QueryResult;
use crate::value::Value;

/// A boxed future for async callables.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Async modifier transform: `(field, value) -> value`.
pub type ModifierFn =
    Arc<dyn Fn(String, Value) -> BoxFuture<'static, QueryResult<Value>> + Send + Sync>;

/// Synchronous value interceptor: `(value, policy) -> value`.
pub type SyncInterceptorFn = Arc<dyn Fn(Value, &Policy) -> QueryResult<Value> + Send + Sync>;

/// Asynchronous value interceptor: `(value, policy) -> future of value`.
pub type AsyncInterceptorFn =
    Arc<dyn Fn(Value, Arc<Policy>) -> BoxFuture<'static, QueryResult<Value>> + Send + Sync>;

type PostInterceptorFn =
    Arc<dyn Fn(String, Value, Arc<Policy>) -> BoxFuture<'static, QueryResult<Value>> + Send + Sync>;

/// How a modifier is treated when it appears in an expression.
#[derive(Clone)]
pub enum ModifierSpec {
    /// Pass the value through unchanged.
    Allow,
    /// Reject the modifier, exactly as if it were not configured.
    Forbid,
    /// Replace or expand the value with a caller transform.
    ///
    /// A map result is merged into the field's normalized expression; any
    /// other result replaces it.
    Transform(ModifierFn),
    /// A configuration entry of an unusable shape. Using the modifier is a
    /// server-side error; the string describes what was configured.
    Malformed(String),
}

impl ModifierSpec {
    /// Build a transform from a synchronous closure.
    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(&str, Value) -> QueryResult<Value> + Send + Sync + 'static,
    {
        Self::Transform(Arc::new(
            move |field: String, value: Value| -> BoxFuture<'static, QueryResult<Value>> {
                Box::pin(future::ready(f(&field, value)))
            },
        ))
    }

    /// Build a transform from an async closure.
    pub fn transform_async<F, Fut>(f: F) -> Self
    where
        F: Fn(String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueryResult<Value>> + Send + 'static,
    {
        Self::Transform(Arc::new(
            move |field: String, value: Value| -> BoxFuture<'static, QueryResult<Value>> {
                Box::pin(f(field, value))
            },
        ))
    }

    /// Whether the modifier may be used at all.
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Self::Forbid)
    }
}

impl From<bool> for ModifierSpec {
    fn from(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Forbid }
    }
}

impl fmt::Debug for ModifierSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("Allow"),
            Self::Forbid => f.write_str("Forbid"),
            Self::Transform(_) => f.write_str("Transform(<fn>)"),
            Self::Malformed(what) => f.debug_tuple("Malformed").field(what).finish(),
        }
    }
}

/// A per-field transform applied to terminal values.
#[derive(Clone)]
pub enum InterceptorSpec {
    /// Runs inline.
    Sync(SyncInterceptorFn),
    /// Awaited; may suspend.
    Async(AsyncInterceptorFn),
}

impl InterceptorSpec {
    /// Build an interceptor from a synchronous closure.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(Value, &Policy) -> QueryResult<Value> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Build an interceptor from an async closure.
    pub fn new_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Arc<Policy>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueryResult<Value>> + Send + 'static,
    {
        Self::Async(Arc::new(
            move |value: Value, policy: Arc<Policy>| -> BoxFuture<'static, QueryResult<Value>> {
                Box::pin(f(value, policy))
            },
        ))
    }
}

impl fmt::Debug for InterceptorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Sync(<fn>)"),
            Self::Async(_) => f.write_str("Async(<fn>)"),
        }
    }
}

/// A hook applied to every field's normalized value.
#[derive(Clone)]
pub struct PostInterceptor(PostInterceptorFn);

impl PostInterceptor {
    /// Build the hook from a synchronous closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, Value, &Policy) -> QueryResult<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(
            move |field: String,
                  value: Value,
                  policy: Arc<Policy>|
                  -> BoxFuture<'static, QueryResult<Value>> {
                Box::pin(future::ready(f(&field, value, &policy)))
            },
        ))
    }

    /// Build the hook from an async closure.
    pub fn new_async<F, Fut>(f: F) -> Self
    where
        F: Fn(String, Value, Arc<Policy>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueryResult<Value>> + Send + 'static,
    {
        Self(Arc::new(
            move |field: String,
                  value: Value,
                  policy: Arc<Policy>|
                  -> BoxFuture<'static, QueryResult<Value>> { Box::pin(f(field, value, policy)) },
        ))
    }

    /// Run the hook.
    pub fn call(
        &self,
        field: &str,
        value: Value,
        policy: Arc<Policy>,
    ) -> BoxFuture<'static, QueryResult<Value>> {
        (self.0)(field.to_string(), value, policy)
    }
}

impl fmt::Debug for PostInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PostInterceptor(<fn>)")
    }
}

/// Renames a field in the normalized output.
#[derive(Clone)]
pub struct FieldMapper(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl FieldMapper {
    /// Wrap a renaming function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// A mapper backed by a fixed rename table; unknown fields pass through.
    pub fn table<I, K, V>(renames: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let table: std::collections::HashMap<String, String> = renames
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(move |field| table.get(field).cloned().unwrap_or_else(|| field.to_string()))
    }

    /// Apply the mapper.
    pub fn apply(&self, field: &str) -> String {
        (self.0)(field)
    }
}

impl fmt::Debug for FieldMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldMapper(<fn>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_from_bool() {
        assert!(matches!(ModifierSpec::from(true), ModifierSpec::Allow));
        assert!(matches!(ModifierSpec::from(false), ModifierSpec::Forbid));
        assert!(!ModifierSpec::Forbid.is_enabled());
        assert!(ModifierSpec::Malformed("\"x\"".into()).is_enabled());
    }

    #[tokio::test]
    async fn test_sync_transform_is_awaitable() {
        let spec = ModifierSpec::transform(|field, value| {
            Ok(Value::from(format!("{}={:?}", field, value.as_i64())))
        });
        let ModifierSpec::Transform(f) = spec else {
            panic!("expected a transform");
        };
        let out = f("age".to_string(), Value::Int(3)).await.unwrap();
        assert_eq!(out, Value::from("age=Some(3)"));
    }

    #[test]
    fn test_field_mapper_table() {
        let mapper = FieldMapper::table([("first", "first_name")]);
        assert_eq!(mapper.apply("first"), "first_name");
        assert_eq!(mapper.apply("last"), "last");
    }
}
