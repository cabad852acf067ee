//! The query-string service: default options plus the parse entry points.

use serde::Serialize;
use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::options::FilterOptions;
use crate::parse::{Page, PageOptions, parse_filter, parse_page};
use crate::request::RequestQuery;
use crate::transit::{self, TransitResult};
use crate::value::{Map, Value};

/// Options for [`QueryStringService::parse_query_string`].
#[derive(Debug, Clone, Default)]
pub struct QueryStringOptions {
    /// Filter policy.
    pub filter: FilterOptions,
    /// Pagination bounds.
    pub page: PageOptions,
}

impl QueryStringOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter options.
    pub fn filter(mut self, filter: FilterOptions) -> Self {
        self.filter = filter;
        self
    }

    /// Set the pagination options.
    pub fn page(mut self, page: PageOptions) -> Self {
        self.page = page;
        self
    }

    /// Layer `overrides` on top of these options.
    pub fn merge(&self, overrides: &QueryStringOptions) -> QueryStringOptions {
        QueryStringOptions {
            filter: self.filter.merge(&overrides.filter),
            page: self.page.merge(&overrides.page),
        }
    }
}

/// The result of parsing a query string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedQuery {
    /// The normalized filter. `None` when the request carried no filter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Map>,
    /// Pagination instructions.
    pub page: Page,
}

/// Parses request query strings against a set of default options.
///
/// ```rust
/// use filtrate_query::{
///     FilterOptions, QueryStringOptions, QueryStringService, RequestQuery, Value,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let service = QueryStringService::new(
///     QueryStringOptions::new().filter(FilterOptions::new().whitelist(["last"])),
/// );
///
/// let filter = service.encode(&Value::map([("last", "smith")]));
/// let query = RequestQuery::new().with_filter(filter);
/// let parsed = service.parse_query_string(&query, None).await.unwrap();
/// assert_eq!(parsed.filter.unwrap()["last"], Value::from("smith"));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryStringService {
    options: QueryStringOptions,
}

impl QueryStringService {
    /// Create a service with default options.
    pub fn new(options: QueryStringOptions) -> Self {
        Self { options }
    }

    /// The default options.
    pub fn options(&self) -> &QueryStringOptions {
        &self.options
    }

    /// Decode transit-encoded data.
    pub fn decode(&self, encoded: &str) -> TransitResult<Value> {
        transit::decode(encoded)
    }

    /// Transit-encode a value.
    pub fn encode(&self, value: &Value) -> String {
        transit::encode(value)
    }

    /// Parse the filter and pagination parameters of `query`.
    ///
    /// `overrides`, when given, are layered on top of the service defaults
    /// for this call only. Filter and pagination are parsed concurrently;
    /// the first error wins.
    pub async fn parse_query_string(
        &self,
        query: &RequestQuery,
        overrides: Option<&QueryStringOptions>,
    ) -> QueryResult<ParsedQuery> {
        let options = match overrides {
            Some(overrides) => self.options.merge(overrides),
            None => self.options.clone(),
        };
        debug!(has_filter = query.filter().is_some(), "parsing query string");
        crate::filtrate_trace!(page_options = ?options.page, "effective pagination options");

        let (filter, page) = futures::try_join!(
            parse_filter(query, &options.filter),
            async { parse_page(query, &options.page) },
        )?;

        Ok(ParsedQuery { filter, page })
    }

    /// Parse a raw query string such as `filter=...&page[size]=10`.
    pub async fn parse_raw(
        &self,
        raw: &str,
        overrides: Option<&QueryStringOptions>,
    ) -> QueryResult<ParsedQuery> {
        self.parse_query_string(&RequestQuery::parse(raw), overrides).await
    }

    /// Decode and wrap a transit error for HTTP callers.
    pub fn decode_for_request(&self, encoded: &str) -> QueryResult<Value> {
        self.decode(encoded)
            .map_err(|e| QueryError::undecodable_filter().with_source(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::SizeOptions;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_absent_filter_has_no_key() {
        let service = QueryStringService::default();
        let parsed = service.parse_raw("page[size]=10", None).await.unwrap();
        assert_eq!(parsed.filter, None);

        let json = serde_json::to_value(&parsed).unwrap();
        assert!(json.get("filter").is_none());
        assert_eq!(json["page"]["limit"], 10);
    }

    #[tokio::test]
    async fn test_overrides_apply_per_call() {
        let service = QueryStringService::new(
            QueryStringOptions::new().filter(FilterOptions::new().allow("$gte")),
        );
        let filter = service.encode(&Value::map([("age", Value::map([("$gte", 1)]))]));
        let query = RequestQuery::new().with_filter(filter);

        assert!(service.parse_query_string(&query, None).await.is_ok());

        let strict = QueryStringOptions::new().filter(FilterOptions::new().forbid("$gte"));
        let err = service.parse_query_string(&query, Some(&strict)).await.unwrap_err();
        assert_eq!(err.status(), 400);

        assert!(service.parse_query_string(&query, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_page_errors_surface() {
        let service = QueryStringService::new(
            QueryStringOptions::new().page(PageOptions::new().size(SizeOptions::new().max(10))),
        );
        let err = service.parse_raw("page[size]=11", None).await.unwrap_err();
        assert_eq!(err.status(), 400);
    }

    #[test]
    fn test_decode_encode() {
        let service = QueryStringService::default();
        let value = Value::map([("a", Value::from(vec![1, 2]))]);
        assert_eq!(service.decode(&service.encode(&value)).unwrap(), value);
        assert!(service.decode_for_request("nope").is_err());
    }
}
