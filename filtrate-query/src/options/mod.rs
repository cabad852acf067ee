//! Filter policy options.
//!
//! [`FilterOptions`] is the caller-facing, unvalidated description of what a
//! filter may contain. [`FilterOptions::validate`] checks it and produces the
//! immutable [`Policy`] that the normalization engine runs against.
//!
//! ```rust
//! use filtrate_query::options::FilterOptions;
//! use filtrate_query::Value;
//!
//! let options = FilterOptions::new()
//!     .whitelist(["first", "last", "age"])
//!     .allow("$gte")
//!     .allow("$lt")
//!     .modifier_fn("$startsWith", |_field, value| {
//!         Ok(Value::map([("$regex", value)]))
//!     });
//!
//! let policy = options.validate().unwrap();
//! assert!(policy.should_whitelist());
//! assert!(policy.is_logical_operator("$or"));
//! ```

mod callables;
mod config;
mod policy;

pub use callables::{
    AsyncInterceptorFn, BoxFuture, FieldMapper, InterceptorSpec, ModifierFn, ModifierSpec,
    PostInterceptor, SyncInterceptorFn,
};
pub use config::{FilterConfig, OneOrMany};
pub use policy::{DEFAULT_LOGICAL_OPERATORS, DEFAULT_MAX_DEPTH, Policy};

use std::future::Future;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::error::{QueryError, QueryResult};
use crate::value::Value;

/// Unvalidated filter options.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Fields whose value is a list of sub-clauses. Defaults to `$or`, `$and`.
    pub logical_operators: Option<Vec<String>>,
    /// Modifier vocabulary.
    pub modifiers: IndexMap<String, ModifierSpec>,
    /// Fields permitted in a clause. Takes precedence over the blacklist.
    pub whitelist: Option<Vec<String>>,
    /// Fields forbidden in a clause when no whitelist is in effect.
    pub blacklist: Option<Vec<String>>,
    /// Per-field terminal value transforms.
    pub interceptors: IndexMap<String, InterceptorSpec>,
    /// Hook applied to each field's normalized value.
    pub intercept_normalized_expression: Option<PostInterceptor>,
    /// Output field renamers, applied in order.
    pub map_fields: Vec<FieldMapper>,
    /// Nesting limit for clauses and expressions.
    pub max_depth: Option<usize>,
    /// Keys of an untyped configuration document that are not options.
    pub unknown: Vec<String>,
}

impl FilterOptions {
    /// Empty options: default logical operators, no modifiers, no lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the logical operator set.
    pub fn logical_operators<I, S>(mut self, operators: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.logical_operators = Some(operators.into_iter().map(Into::into).collect());
        self
    }

    /// Permit a modifier, passing its value through unchanged.
    pub fn allow(self, name: impl Into<String>) -> Self {
        self.modifier(name, ModifierSpec::Allow)
    }

    /// Forbid a modifier explicitly.
    pub fn forbid(self, name: impl Into<String>) -> Self {
        self.modifier(name, ModifierSpec::Forbid)
    }

    /// Set a modifier definition.
    pub fn modifier(mut self, name: impl Into<String>, spec: impl Into<ModifierSpec>) -> Self {
        self.modifiers.insert(name.into(), spec.into());
        self
    }

    /// Define a modifier with a synchronous transform.
    pub fn modifier_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str, Value) -> QueryResult<Value> + Send + Sync + 'static,
    {
        self.modifier(name, ModifierSpec::transform(f))
    }

    /// Define a modifier with an async transform.
    pub fn modifier_async<F, Fut>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(String, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueryResult<Value>> + Send + 'static,
    {
        self.modifier(name, ModifierSpec::transform_async(f))
    }

    /// Set the whitelist.
    pub fn whitelist<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set the blacklist.
    pub fn blacklist<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blacklist = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Attach a synchronous interceptor to a field.
    pub fn interceptor<F>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, &Policy) -> QueryResult<Value> + Send + Sync + 'static,
    {
        self.interceptors.insert(field.into(), InterceptorSpec::sync(f));
        self
    }

    /// Attach an async interceptor to a field.
    pub fn interceptor_async<F, Fut>(mut self, field: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, Arc<Policy>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueryResult<Value>> + Send + 'static,
    {
        self.interceptors.insert(field.into(), InterceptorSpec::new_async(f));
        self
    }

    /// Set the post-normalization hook from a synchronous closure.
    pub fn intercept_normalized<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Value, &Policy) -> QueryResult<Value> + Send + Sync + 'static,
    {
        self.intercept_normalized_expression = Some(PostInterceptor::new(f));
        self
    }

    /// Set the post-normalization hook from an async closure.
    pub fn intercept_normalized_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(String, Value, Arc<Policy>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueryResult<Value>> + Send + 'static,
    {
        self.intercept_normalized_expression = Some(PostInterceptor::new_async(f));
        self
    }

    /// Append an output field renamer.
    pub fn map_field(mut self, mapper: FieldMapper) -> Self {
        self.map_fields.push(mapper);
        self
    }

    /// Set the nesting limit.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Layer `overrides` on top of these options.
    ///
    /// Settings present in `overrides` win; modifier and interceptor tables
    /// merge key by key; field renamers run defaults first.
    pub fn merge(&self, overrides: &FilterOptions) -> FilterOptions {
        let mut merged = self.clone();

        if overrides.logical_operators.is_some() {
            merged.logical_operators = overrides.logical_operators.clone();
        }
        if overrides.whitelist.is_some() {
            merged.whitelist = overrides.whitelist.clone();
        }
        if overrides.blacklist.is_some() {
            merged.blacklist = overrides.blacklist.clone();
        }
        if overrides.intercept_normalized_expression.is_some() {
            merged.intercept_normalized_expression =
                overrides.intercept_normalized_expression.clone();
        }
        if overrides.max_depth.is_some() {
            merged.max_depth = overrides.max_depth;
        }
        for (name, spec) in &overrides.modifiers {
            merged.modifiers.insert(name.clone(), spec.clone());
        }
        for (field, spec) in &overrides.interceptors {
            merged.interceptors.insert(field.clone(), spec.clone());
        }
        merged.map_fields.extend(overrides.map_fields.iter().cloned());
        for key in &overrides.unknown {
            if !merged.unknown.contains(key) {
                merged.unknown.push(key.clone());
            }
        }

        merged
    }

    /// Validate the options and build a [`Policy`].
    pub fn validate(&self) -> QueryResult<Policy> {
        if let Some(key) = self.unknown.first() {
            return Err(QueryError::invalid_options(format!("\"{}\" is not allowed", key))
                .with_field(key.clone()));
        }

        let logical_operators = match &self.logical_operators {
            Some(operators) => names("logicalOperators", operators)?,
            None => DEFAULT_LOGICAL_OPERATORS.iter().map(|s| s.to_string()).collect(),
        };
        let whitelist = names("whitelist", self.whitelist.as_deref().unwrap_or_default())?;
        let blacklist = names("blacklist", self.blacklist.as_deref().unwrap_or_default())?;

        if self.modifiers.keys().any(String::is_empty) {
            return Err(QueryError::invalid_options(
                "\"modifiers\" must not contain an empty modifier name",
            ));
        }
        if self.interceptors.keys().any(String::is_empty) {
            return Err(QueryError::invalid_options(
                "\"interceptors\" must not contain an empty field name",
            ));
        }

        let max_depth = self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
        if max_depth == 0 {
            return Err(QueryError::invalid_options("\"maxDepth\" must be at least 1"));
        }

        let should_whitelist = !whitelist.is_empty();
        let should_blacklist = !should_whitelist && !blacklist.is_empty();

        Ok(Policy {
            logical_operators,
            modifiers: self.modifiers.clone(),
            whitelist,
            blacklist,
            interceptors: self.interceptors.clone(),
            intercept_normalized_expression: self.intercept_normalized_expression.clone(),
            map_fields: self.map_fields.clone(),
            max_depth,
            should_whitelist,
            should_blacklist,
        })
    }
}

fn names(option: &str, values: &[String]) -> QueryResult<IndexSet<String>> {
    match values.iter().position(String::is_empty) {
        Some(index) => Err(QueryError::invalid_options(format!(
            "\"{}\" at position {} is not allowed to be empty",
            option, index
        ))),
        None => Ok(values.iter().cloned().collect()),
    }
}
