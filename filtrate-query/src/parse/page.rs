//! The `page[...]` query parameters.
//!
//! Offset-based pagination (`size` + `number`, or `limit` + `offset`) and an
//! opaque `cursor` are accepted. Page sizes are bounded by [`PageOptions`].
//!
//! ```rust
//! use filtrate_query::parse::{PageOptions, SizeOptions, parse_page};
//! use filtrate_query::RequestQuery;
//!
//! let options = PageOptions::new().size(SizeOptions::new().with_default(20).max(100));
//!
//! let query = RequestQuery::parse("page[number]=3");
//! let page = parse_page(&query, &options).unwrap();
//! assert_eq!(page.size, Some(20));
//! assert_eq!(page.limit, Some(20));
//! assert_eq!(page.skip, Some(40));
//! assert_eq!(page.to_sql(), "LIMIT 20 OFFSET 40");
//!
//! let query = RequestQuery::parse("page[size]=500");
//! assert!(parse_page(&query, &options).is_err());
//! ```

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::request::RequestQuery;

/// Bounds and default for the page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizeOptions {
    /// Size used when the request names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<u64>,
    /// Smallest permitted size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    /// Largest permitted size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

impl SizeOptions {
    /// No bounds, no default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default size.
    pub fn with_default(mut self, size: u64) -> Self {
        self.default = Some(size);
        self
    }

    /// Set the minimum size.
    pub fn min(mut self, size: u64) -> Self {
        self.min = Some(size);
        self
    }

    /// Set the maximum size.
    pub fn max(mut self, size: u64) -> Self {
        self.max = Some(size);
        self
    }
}

/// Pagination options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PageOptions {
    /// Page size settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeOptions>,
}

impl PageOptions {
    /// Unbounded pagination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page size settings.
    pub fn size(mut self, size: SizeOptions) -> Self {
        self.size = Some(size);
        self
    }

    /// Layer `overrides` on top of these options, field by field.
    pub fn merge(&self, overrides: &PageOptions) -> PageOptions {
        let size = match (self.size, overrides.size) {
            (Some(base), Some(over)) => Some(SizeOptions {
                default: over.default.or(base.default),
                min: over.min.or(base.min),
                max: over.max.or(base.max),
            }),
            (base, over) => over.or(base),
        };
        PageOptions { size }
    }

    /// Check that the options are internally consistent.
    pub fn validate(&self) -> QueryResult<()> {
        let Some(size) = self.size else {
            return Ok(());
        };

        for (name, bound) in [("size.min", size.min), ("size.max", size.max)] {
            if bound == Some(0) {
                return Err(QueryError::invalid_page_options(format!(
                    "\"{}\" must be larger than or equal to 1",
                    name
                )));
            }
        }
        if let (Some(min), Some(max)) = (size.min, size.max) {
            if min > max {
                return Err(QueryError::invalid_page_options(
                    "\"size.min\" must be less than or equal to \"size.max\"",
                ));
            }
        }
        if let Some(default) = size.default {
            if let Err(reason) = check_bounds("size.default", default, &size) {
                return Err(QueryError::invalid_page_options(reason));
            }
        }

        Ok(())
    }
}

/// Validated pagination instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    /// Requested (or default) page size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// 1-based page number.
    pub number: u64,
    /// Opaque cursor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    /// Explicit offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Maximum number of records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Records to skip, derived from `size` and `number`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            size: None,
            number: 1,
            cursor: None,
            offset: None,
            limit: None,
            skip: None,
        }
    }
}

impl Page {
    /// Records to skip: the derived `skip`, else the explicit `offset`.
    pub fn effective_offset(&self) -> Option<u64> {
        self.skip.or(self.offset)
    }

    /// Generate a SQL `LIMIT`/`OFFSET` clause.
    pub fn to_sql(&self) -> String {
        let mut sql = String::with_capacity(54);

        if let Some(limit) = self.limit {
            let _ = write!(sql, "LIMIT {}", limit);
        }

        if let Some(offset) = self.effective_offset() {
            if !sql.is_empty() {
                sql.push(' ');
            }
            let _ = write!(sql, "OFFSET {}", offset);
        }

        sql
    }
}

/// Validate the request's `page[...]` parameters.
///
/// Invalid options are a server error; invalid parameters are a bad
/// request. When a size is known and no explicit `limit` was sent, `limit`
/// becomes the size and `skip` is computed from the page number.
pub fn parse_page(query: &RequestQuery, options: &PageOptions) -> QueryResult<Page> {
    options.validate()?;
    let bounds = options.size.unwrap_or_default();

    let mut page = Page::default();
    for (name, raw) in query.page() {
        match name.as_str() {
            "size" => page.size = Some(bounded("size", raw, &bounds)?),
            "limit" => page.limit = Some(bounded("limit", raw, &bounds)?),
            "number" => {
                page.number = integer("number", raw)?;
                if page.number < 1 {
                    return Err(QueryError::invalid_pagination(
                        "\"number\" must be larger than or equal to 1",
                    ));
                }
            }
            "offset" => page.offset = Some(integer("offset", raw)?),
            "cursor" => page.cursor = Some(raw.clone()),
            other => {
                return Err(QueryError::invalid_pagination(format!("\"{}\" is not allowed", other)));
            }
        }
    }

    if page.size.is_none() {
        page.size = bounds.default;
    }
    if let (Some(size), None) = (page.size, page.limit) {
        page.limit = Some(size);
        page.skip = Some((page.number - 1).saturating_mul(size));
    }

    tracing::trace!(?page, "pagination parsed");
    Ok(page)
}

fn integer(name: &str, raw: &str) -> QueryResult<u64> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<u64>() {
        return Ok(n);
    }
    let reason = match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() && n.fract() == 0.0 && n >= 0.0 && n <= u64::MAX as f64 => {
            return Ok(n as u64);
        }
        Ok(n) if n < 0.0 => format!("\"{}\" must be larger than or equal to 0", name),
        Ok(_) => format!("\"{}\" must be an integer", name),
        Err(_) => format!("\"{}\" must be a number", name),
    };
    Err(QueryError::invalid_pagination(reason))
}

fn bounded(name: &str, raw: &str, bounds: &SizeOptions) -> QueryResult<u64> {
    let n = integer(name, raw)?;
    check_bounds(name, n, bounds).map_err(QueryError::invalid_pagination)?;
    Ok(n)
}

fn check_bounds(name: &str, n: u64, bounds: &SizeOptions) -> Result<u64, String> {
    if let Some(min) = bounds.min.filter(|&min| n < min) {
        return Err(format!("\"{}\" must be larger than or equal to {}", name, min));
    }
    if let Some(max) = bounds.max.filter(|&max| n > max) {
        return Err(format!("\"{}\" must be less than or equal to {}", name, max));
    }
    Ok(n)
}
