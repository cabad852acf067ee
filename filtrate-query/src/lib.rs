//! # filtrate-query
//!
//! Transit-encoded query-string filters for REST services.
//!
//! A request carries a filter as transit-JSON in its `filter` parameter and
//! pagination in `page[...]` parameters. This crate decodes the filter,
//! checks it against a caller-defined policy and rewrites it into a
//! normalized map for a data-access layer:
//! - Transit-JSON codec (`transit`)
//! - Policy options: logical operators, modifiers, whitelist and blacklist,
//!   interceptors, field renaming (`options`)
//! - The recursive clause/expression normalizer (`process`)
//! - Filter and pagination parameter parsing (`parse`)
//! - A service tying both together (`QueryStringService`)
//!
//! ## Normalizing a Filter
//!
//! ```rust
//! use filtrate_query::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let options = FilterOptions::new()
//!     .whitelist(["first", "last", "age"])
//!     .allow("$gte")
//!     .interceptor("last", |value, _policy| {
//!         Ok(value.as_str().map(str::to_lowercase).map(Value::from).unwrap_or(value))
//!     });
//!
//! let encoded = r#"["^ ","last","Smith","age",["^ ","$gte",21]]"#;
//! let query = RequestQuery::new().with_filter(encoded);
//!
//! let filter = parse_filter(&query, &options).await.unwrap().unwrap();
//! assert_eq!(filter["last"], Value::from("smith"));
//! assert_eq!(filter["age"], Value::map([("$gte", 21)]));
//! # }
//! ```
//!
//! ## Rejections
//!
//! Anything outside the policy fails the whole filter with a 400:
//!
//! ```rust
//! use filtrate_query::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let options = FilterOptions::new().blacklist(["password"]);
//! let query = RequestQuery::new().with_filter(r#"["^ ","password","hunter2"]"#);
//!
//! let err = parse_filter(&query, &options).await.unwrap_err();
//! assert_eq!(err.status(), 400);
//! assert_eq!(err.detail(), "Forbidden field provided in query filter: password");
//! # }
//! ```
//!
//! ## Modifier Operands
//!
//! A modifier's operand is processed like any field value before the
//! modifier sees it: terminal values pass through the field's interceptor,
//! lists are processed element by element, and every map is read as a
//! modifier expression. A map inside a list operand (`{"$in": [{...}]}`)
//! must therefore consist of allowed modifiers:
//!
//! ```rust
//! use filtrate_query::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let options = FilterOptions::new().allow("$in");
//! let query = RequestQuery::new().with_filter(r#"["^ ","tags",["^ ","$in",[["^ ","a",1]]]]"#);
//!
//! let err = parse_filter(&query, &options).await.unwrap_err();
//! assert_eq!(err.detail(), "Undefined/Forbidden modifier found in query filter: a");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use filtrate_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::forbidden_modifier("$where");
//! assert_eq!(err.code, ErrorCode::ForbiddenModifier);
//! assert_eq!(err.to_body().title, "Bad Request");
//! ```

pub mod error;
pub mod logging;
pub mod options;
pub mod parse;
pub mod process;
pub mod request;
pub mod service;
pub mod transit;
pub mod value;

pub use error::{ErrorBody, ErrorCode, ErrorContext, ErrorKind, QueryError, QueryResult};
pub use options::{
    FieldMapper, FilterConfig, FilterOptions, InterceptorSpec, ModifierSpec, Policy,
    PostInterceptor,
};
pub use parse::{Page, PageOptions, SizeOptions, parse_filter, parse_page};
pub use process::{intercept, normalize_clause, normalize_expression, process_expression};
pub use request::RequestQuery;
pub use service::{ParsedQuery, QueryStringOptions, QueryStringService};
pub use transit::TransitError;
pub use value::{Map, Pattern, Value, is_expression};

pub use logging::{init as init_logging, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::options::{FieldMapper, FilterConfig, FilterOptions, ModifierSpec, Policy};
    pub use crate::parse::{Page, PageOptions, SizeOptions, parse_filter, parse_page};
    pub use crate::request::RequestQuery;
    pub use crate::service::{ParsedQuery, QueryStringOptions, QueryStringService};
    pub use crate::value::{Map, Pattern, Value, is_expression};
}
