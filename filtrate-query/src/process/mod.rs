//! The clause/expression normalization engine.
//!
//! A filter is walked top-down:
//!
//! - [`normalize_clause`] handles a map of field names (and logical
//!   operators) to expressions;
//! - [`process_expression`] dispatches on the shape of a field's value;
//! - [`normalize_expression`] handles a map of modifiers;
//! - [`intercept`] applies per-field transforms to terminal values.
//!
//! Every function takes the validated [`Policy`] explicitly and returns a
//! boxed future so that recursion and caller callables may suspend. Inputs
//! are borrowed and never modified; each level builds a fresh map.

mod clause;
mod expression;
mod intercept;
mod modifier;

pub use clause::normalize_clause;
pub use expression::process_expression;
pub use intercept::intercept;
pub use modifier::normalize_expression;

use crate::error::{QueryError, QueryResult};
use crate::options::Policy;

/// How many logical-operator branches are normalized at once.
pub const BRANCH_CONCURRENCY: usize = 8;

/// Fail once `depth` exceeds the policy's nesting limit.
#[inline]
fn check_depth(depth: usize, policy: &Policy) -> QueryResult<()> {
    if depth > policy.max_depth() {
        tracing::debug!(depth, max_depth = policy.max_depth(), "filter nesting limit reached");
        return Err(QueryError::nesting_too_deep(policy.max_depth()));
    }
    Ok(())
}
