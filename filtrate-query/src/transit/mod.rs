//! Transit-JSON codec for filter payloads.
//!
//! Filters travel in the query string as [transit](https://github.com/cognitect/transit-format)
//! JSON, which keeps dates and map keys intact where plain JSON would not.
//!
//! ```rust
//! use filtrate_query::transit;
//! use filtrate_query::Value;
//!
//! let decoded = transit::decode(r#"["^ ","last","smith","age",["^ ","$gte",21]]"#).unwrap();
//! assert_eq!(
//!     decoded,
//!     Value::map([
//!         ("last", Value::from("smith")),
//!         ("age", Value::map([("$gte", 21)])),
//!     ])
//! );
//!
//! let encoded = transit::encode(&decoded);
//! assert_eq!(transit::decode(&encoded).unwrap(), decoded);
//! ```
//!
//! Map keys are always literal: `"account.balance"` stays a single key and is
//! never expanded into a nested path.

mod cache;
mod reader;
mod writer;

pub use cache::{MAX_CACHE_ENTRIES, ReadCache, WriteCache, is_cache_code, is_cacheable};
pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

use crate::value::Value;

/// Result type for codec operations.
pub type TransitResult<T> = Result<T, TransitError>;

/// Errors produced while decoding transit data.
#[derive(Error, Debug)]
pub enum TransitError {
    /// The payload is not valid JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A `^N` reference that does not resolve.
    #[error("invalid cache reference '{0}'")]
    InvalidCacheRef(String),

    /// A `~#tag` this reader has no handler for.
    #[error("unknown tag '{0}'")]
    UnknownTag(String),

    /// A tag string outside of a tagged-value position.
    #[error("tag '{0}' used outside a tagged value")]
    MisplacedTag(String),

    /// A scalar that does not parse under its tag.
    #[error("invalid '~{tag}' value '{value}'")]
    InvalidScalar {
        /// The one-character scalar tag.
        tag: char,
        /// The raw representation.
        value: String,
    },

    /// A tagged value whose representation has the wrong shape.
    #[error("invalid representation for tag '{tag}': {reason}")]
    InvalidTaggedValue {
        /// The tag.
        tag: String,
        /// What was wrong.
        reason: String,
    },

    /// A map key that is not a string.
    #[error("map keys must be strings, found {0}")]
    NonStringKey(&'static str),

    /// A map-as-array with a dangling key.
    #[error("map has a key without a value")]
    OddMapEntries,
}

/// Decode a transit-JSON string.
pub fn decode(encoded: &str) -> TransitResult<Value> {
    Reader::new().read(encoded)
}

/// Encode a value as transit-JSON.
pub fn encode(value: &Value) -> String {
    Writer::new().write(value)
}
