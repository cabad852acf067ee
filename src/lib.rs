//! # Filtrate
//!
//! Transit-encoded query-string filters for REST services.
//!
//! Filtrate provides:
//! - A transit-JSON codec for filter payloads
//! - Policy-driven validation of fields, logical operators and modifiers
//! - Async normalization with caller-defined modifiers and interceptors
//! - Pagination parameter parsing
//! - Optional Axum integration (`axum` feature)
//!
//! ## Quick Start
//!
//! ```rust
//! use filtrate::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let service = QueryStringService::new(
//!     QueryStringOptions::new().filter(
//!         FilterOptions::new()
//!             .whitelist(["first", "last", "age"])
//!             .allow("$gte"),
//!     ),
//! );
//!
//! let parsed = service
//!     .parse_raw(
//!         concat!(
//!             "filter=%5B%22%5E+%22%2C%22age%22%2C%5B%22%5E+%22%2C%22%24gte%22%2C21%5D%5D",
//!             "&page[size]=10",
//!         ),
//!         None,
//!     )
//!     .await
//!     .unwrap();
//!
//! assert_eq!(parsed.filter.unwrap()["age"], Value::map([("$gte", 21)]));
//! assert_eq!(parsed.page.to_sql(), "LIMIT 10 OFFSET 0");
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The filter engine.
pub mod query {
    pub use filtrate_query::*;
}

/// Axum integration.
#[cfg(feature = "axum")]
#[cfg_attr(docsrs, doc(cfg(feature = "axum")))]
pub mod axum {
    pub use filtrate_axum::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use filtrate_query::prelude::*;

    #[cfg(feature = "axum")]
    pub use filtrate_axum::{FiltrateLayer, FiltrateRejection, FiltrateState, QueryFilter};
}

// Re-export key types at the crate root
pub use filtrate_query::{QueryError, QueryResult, Value, transit};
