//! The validated, immutable policy the normalization engine runs against.

use indexmap::{IndexMap, IndexSet};

use super::callables::{FieldMapper, InterceptorSpec, ModifierSpec, PostInterceptor};

/// Default recursion limit for attacker-supplied filters.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Logical operators recognized when none are configured.
pub const DEFAULT_LOGICAL_OPERATORS: [&str; 2] = ["$or", "$and"];

/// Validated filter policy.
///
/// Produced by [`FilterOptions::validate`](super::FilterOptions::validate)
/// and shared as `Arc<Policy>` by every step of one parse.
#[derive(Debug, Clone)]
pub struct Policy {
    pub(crate) logical_operators: IndexSet<String>,
    pub(crate) modifiers: IndexMap<String, ModifierSpec>,
    pub(crate) whitelist: IndexSet<String>,
    pub(crate) blacklist: IndexSet<String>,
    pub(crate) interceptors: IndexMap<String, InterceptorSpec>,
    pub(crate) intercept_normalized_expression: Option<PostInterceptor>,
    pub(crate) map_fields: Vec<FieldMapper>,
    pub(crate) max_depth: usize,
    pub(crate) should_whitelist: bool,
    pub(crate) should_blacklist: bool,
}

impl Policy {
    /// Whether `field` is a logical operator whose value is a list of clauses.
    pub fn is_logical_operator(&self, field: &str) -> bool {
        self.logical_operators.contains(field)
    }

    /// Configured logical operators.
    pub fn logical_operators(&self) -> impl Iterator<Item = &str> {
        self.logical_operators.iter().map(String::as_str)
    }

    /// Look up a modifier definition.
    pub fn modifier(&self, name: &str) -> Option<&ModifierSpec> {
        self.modifiers.get(name)
    }

    /// Look up the interceptor for a field.
    pub fn interceptor(&self, field: &str) -> Option<&InterceptorSpec> {
        self.interceptors.get(field)
    }

    /// The post-normalization hook, if configured.
    pub fn post_interceptor(&self) -> Option<&PostInterceptor> {
        self.intercept_normalized_expression.as_ref()
    }

    /// Whether whitelist mode is in effect (whitelist non-empty).
    pub fn should_whitelist(&self) -> bool {
        self.should_whitelist
    }

    /// Whether blacklist mode is in effect (no whitelist, blacklist non-empty).
    pub fn should_blacklist(&self) -> bool {
        self.should_blacklist
    }

    /// True when blacklist mode is in effect and `field` is listed.
    pub fn is_blacklisted(&self, field: &str) -> bool {
        self.should_blacklist && self.blacklist.contains(field)
    }

    /// True when whitelist mode is in effect and `field` is not listed.
    pub fn is_not_whitelisted(&self, field: &str) -> bool {
        self.should_whitelist && !self.whitelist.contains(field)
    }

    /// Output name for a field after every configured mapper has run, in order.
    pub fn map_field(&self, field: &str) -> String {
        self.map_fields
            .iter()
            .fold(field.to_string(), |name, mapper| mapper.apply(&name))
    }

    /// Maximum clause/expression nesting depth.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
}
