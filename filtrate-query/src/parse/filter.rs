//! The `filter` query parameter.

use std::sync::Arc;

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::options::FilterOptions;
use crate::process::normalize_clause;
use crate::request::RequestQuery;
use crate::transit;
use crate::value::Map;

/// Decode, validate and normalize the request's `filter` parameter.
///
/// Returns `Ok(None)` when the parameter is missing or empty. The payload
/// is decoded while the options are validated; when both fail, the decode
/// error is reported.
pub async fn parse_filter(
    query: &RequestQuery,
    options: &FilterOptions,
) -> QueryResult<Option<Map>> {
    let Some(encoded) = query.filter().filter(|f| !f.is_empty()) else {
        return Ok(None);
    };
    debug!(len = encoded.len(), "parsing query filter");

    let (decoded, policy) = futures::try_join!(
        async {
            transit::decode(encoded).map_err(|e| {
                debug!(error = %e, "filter is not valid transit");
                QueryError::undecodable_filter().with_source(e)
            })
        },
        async { options.validate() },
    )?;

    let policy = Arc::new(policy);
    let normalized = normalize_clause(&decoded, &policy, 1).await?;
    debug!(fields = normalized.len(), "query filter normalized");
    Ok(Some(normalized))
}
