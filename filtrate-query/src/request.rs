//! Raw query-string parameters relevant to filtering and pagination.

use indexmap::IndexMap;
use serde::Serialize;

/// The parameters of a request query string.
///
/// `filter` holds the transit-encoded filter. Pagination parameters may be
/// written in bracket form (`page[size]=10`) or dotted form (`page.size=10`);
/// both land in [`RequestQuery::page`].
///
/// ```rust
/// use filtrate_query::RequestQuery;
///
/// let query = RequestQuery::parse("?filter=%5B%22%5E%20%22%5D&page[size]=10&page.number=2");
/// assert_eq!(query.filter(), Some(r#"["^ "]"#));
/// assert_eq!(query.page_param("size"), Some("10"));
/// assert_eq!(query.page_param("number"), Some("2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestQuery {
    filter: Option<String>,
    page: IndexMap<String, String>,
    other: IndexMap<String, String>,
}

impl RequestQuery {
    /// An empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string, with or without the leading `?`.
    ///
    /// When a parameter repeats, the first occurrence is kept.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.strip_prefix('?').unwrap_or(raw);
        let mut query = Self::new();

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            if key == "filter" {
                if query.filter.is_none() {
                    query.filter = Some(value.into_owned());
                }
            } else if let Some(name) = page_key(&key) {
                query.page.entry(name.to_string()).or_insert_with(|| value.into_owned());
            } else {
                query.other.entry(key.into_owned()).or_insert_with(|| value.into_owned());
            }
        }

        query
    }

    /// Set the `filter` parameter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Set a `page[...]` parameter.
    pub fn with_page_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.page.insert(name.into(), value.into());
        self
    }

    /// The raw transit-encoded filter.
    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    /// All `page[...]` parameters.
    pub fn page(&self) -> &IndexMap<String, String> {
        &self.page
    }

    /// A single `page[...]` parameter.
    pub fn page_param(&self, name: &str) -> Option<&str> {
        self.page.get(name).map(String::as_str)
    }

    /// Any other parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.other.get(name).map(String::as_str)
    }
}

fn page_key(key: &str) -> Option<&str> {
    let rest = key.strip_prefix("page")?;
    rest.strip_prefix('[')
        .and_then(|r| r.strip_suffix(']'))
        .or_else(|| rest.strip_prefix('.'))
        .filter(|name| !name.is_empty())
}
