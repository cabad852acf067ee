//! Error types for query-string parsing and filter normalization.
//!
//! Every failure is one of two kinds:
//! - **Bad Request** (400): the caller sent something malformed or forbidden
//! - **Server Error** (500): the service is misconfigured
//!
//! Each error also carries a finer-grained [`ErrorCode`] for programmatic
//! handling. Codes follow the pattern `F{category}{number}`:
//! - 1xxx: payload errors (undecodable filter, not a clause, too deep)
//! - 2xxx: policy violations (forbidden field or modifier, bad operator value)
//! - 3xxx: pagination errors
//! - 4xxx: errors raised by caller-supplied callables
//! - 7xxx: configuration errors
//! - 9xxx: internal errors
//!
//! ```rust
//! use filtrate_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::forbidden_field("password");
//! assert_eq!(err.code, ErrorCode::ForbiddenField);
//! assert_eq!(err.status(), 400);
//! assert_eq!(err.title(), "Bad Request");
//! assert!(err.detail().contains("password"));
//! ```
//!
//! Errors convert to the wire shape handed back to HTTP callers:
//!
//! ```rust
//! use filtrate_query::QueryError;
//!
//! let body = QueryError::invalid_modifier("$foo").to_body();
//! assert_eq!(body.status, 500);
//! assert_eq!(body.title, "Server Error");
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for query-string operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Whose fault an error is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or disallowed input (HTTP 400).
    BadRequest,
    /// Invalid service configuration (HTTP 500).
    ServerError,
}

impl ErrorKind {
    /// HTTP status code for this kind.
    pub const fn status(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::ServerError => 500,
        }
    }

    /// HTTP reason phrase used as the error title.
    pub const fn title(&self) -> &'static str {
        match self {
            Self::BadRequest => "Bad Request",
            Self::ServerError => "Server Error",
        }
    }
}

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Payload errors (1xxx)
    /// The filter payload could not be decoded (F1001).
    UndecodableFilter = 1001,
    /// A clause was expected but something else was found (F1002).
    NotAClause = 1002,
    /// The filter is nested deeper than the configured limit (F1003).
    NestingTooDeep = 1003,

    // Policy violations (2xxx)
    /// Field rejected by the whitelist or blacklist (F2001).
    ForbiddenField = 2001,
    /// Logical operator used with a non-array value (F2002).
    InvalidLogicalOperator = 2002,
    /// Modifier not defined or explicitly forbidden (F2003).
    ForbiddenModifier = 2003,
    /// Filter options failed validation (F2004).
    InvalidOptions = 2004,

    // Pagination errors (3xxx)
    /// Pagination instructions failed validation (F3001).
    InvalidPagination = 3001,

    // Caller callables (4xxx)
    /// A caller-supplied interceptor or modifier rejected the value (F4001).
    Rejected = 4001,

    // Configuration errors (7xxx)
    /// Modifier entry of an unusable shape (F7001).
    InvalidModifier = 7001,
    /// Pagination options failed validation (F7002).
    InvalidPageOptions = 7002,

    // Internal errors (9xxx)
    /// Internal error (F9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "F2001").
    pub fn code(&self) -> String {
        format!("F{}", *self as u16)
    }

    /// The kind of fault this code represents.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidModifier | Self::InvalidPageOptions | Self::Internal => {
                ErrorKind::ServerError
            }
            _ => ErrorKind::BadRequest,
        }
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::UndecodableFilter => "Undecodable filter",
            Self::NotAClause => "Not a query clause",
            Self::NestingTooDeep => "Filter nested too deeply",
            Self::ForbiddenField => "Forbidden field",
            Self::InvalidLogicalOperator => "Invalid logical operator value",
            Self::ForbiddenModifier => "Undefined or forbidden modifier",
            Self::InvalidOptions => "Invalid filter options",
            Self::InvalidPagination => "Invalid pagination instructions",
            Self::Rejected => "Value rejected",
            Self::InvalidModifier => "Invalid modifier definition",
            Self::InvalidPageOptions => "Invalid pagination options",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
///
/// Context is for logs and operators. It never leaks into
/// [`QueryError::detail`].
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The field involved.
    pub field: Option<String>,
    /// The modifier involved.
    pub modifier: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
    /// Help text.
    pub help: Option<String>,
}

/// The `{status, title, detail}` error shape returned to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// HTTP status code.
    pub status: u16,
    /// HTTP reason phrase.
    pub title: String,
    /// Human-readable diagnostic.
    pub detail: String,
}

/// Errors that can occur while parsing a query string.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The kind of fault. Usually `code.kind()`, but caller-constructed
    /// errors may choose either kind.
    pub kind: ErrorKind,
    /// Human-readable diagnostic.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            kind: code.kind(),
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the modifier.
    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.context.modifier = Some(modifier.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// A generic 400 for use by interceptors and modifier transforms.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(ErrorCode::Rejected, detail)
    }

    /// A generic 500 for use by interceptors and modifier transforms.
    pub fn server_error(detail: impl Into<String>) -> Self {
        let mut err = Self::new(ErrorCode::Rejected, detail);
        err.kind = ErrorKind::ServerError;
        err
    }

    /// The filter payload could not be decoded.
    pub fn undecodable_filter() -> Self {
        Self::new(ErrorCode::UndecodableFilter, "Unable to decode transit query filter")
            .with_suggestion("Encode the filter parameter with a transit-json writer")
    }

    /// Filter options failed validation.
    pub fn invalid_options(detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidOptions,
            format!("Invalid 'filter' options: {}", detail),
        )
    }

    /// Something other than a clause was passed where a clause is required.
    pub fn not_a_clause(found: &str) -> Self {
        Self::new(
            ErrorCode::NotAClause,
            "process.clause requires a query clause as an argument",
        )
        .with_help(format!("found {}", found))
    }

    /// The filter is nested beyond `max_depth`.
    pub fn nesting_too_deep(max_depth: usize) -> Self {
        Self::new(
            ErrorCode::NestingTooDeep,
            format!("Query filter exceeds the maximum nesting depth of {}", max_depth),
        )
    }

    /// Field rejected by the whitelist or blacklist.
    pub fn forbidden_field(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::ForbiddenField,
            format!("Forbidden field provided in query filter: {}", field),
        )
        .with_field(field)
    }

    /// Field renamed onto a key another field already produced.
    pub fn conflicting_field(field: impl Into<String>, key: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::ForbiddenField,
            format!(
                "Forbidden field provided in query filter: {} maps onto an existing field {}",
                field,
                key.into()
            ),
        )
        .with_field(field)
    }

    /// Logical operator with a non-array value.
    pub fn logical_operator_requires_array(operator: impl Into<String>) -> Self {
        let operator = operator.into();
        Self::new(
            ErrorCode::InvalidLogicalOperator,
            format!("Logical operator '{}' requires an array value", operator),
        )
        .with_field(operator)
    }

    /// Modifier absent from the policy, or configured as `false`.
    pub fn forbidden_modifier(modifier: impl Into<String>) -> Self {
        let modifier = modifier.into();
        Self::new(
            ErrorCode::ForbiddenModifier,
            format!("Undefined/Forbidden modifier found in query filter: {}", modifier),
        )
        .with_modifier(modifier)
    }

    /// Modifier configured with an unusable shape.
    pub fn invalid_modifier(modifier: impl Into<String>) -> Self {
        let modifier = modifier.into();
        Self::new(
            ErrorCode::InvalidModifier,
            format!(
                "Invalid modifier defined for '{}', must be a boolean or a function",
                modifier
            ),
        )
        .with_modifier(modifier)
    }

    /// Pagination options failed validation.
    pub fn invalid_page_options(detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidPageOptions,
            format!("Invalid 'pagination' options specified: {}", detail),
        )
    }

    /// Pagination instructions failed validation.
    pub fn invalid_pagination(detail: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidPagination,
            format!("Invalid 'pagination' instructions specified: {}", detail),
        )
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // ============== Accessors ==============

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.kind.status()
    }

    /// HTTP reason phrase.
    pub fn title(&self) -> &'static str {
        self.kind.title()
    }

    /// Human-readable diagnostic.
    pub fn detail(&self) -> &str {
        &self.message
    }

    /// Check if this is a caller fault.
    pub fn is_bad_request(&self) -> bool {
        self.kind == ErrorKind::BadRequest
    }

    /// Check if this is a configuration fault.
    pub fn is_server_error(&self) -> bool {
        self.kind == ErrorKind::ServerError
    }

    /// Convert to the `{status, title, detail}` wire shape.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            status: self.status(),
            title: self.title().to_string(),
            detail: self.message.clone(),
        }
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "Error [{}] {} {}: {}\n",
            self.code.code(),
            self.status(),
            self.title(),
            self.message
        ));

        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }
        if let Some(ref modifier) = self.context.modifier {
            output.push_str(&format!("  → Modifier: {}\n", modifier));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<QueryError> for ErrorBody {
    fn from(err: QueryError) -> Self {
        err.to_body()
    }
}
