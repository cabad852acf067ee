//! Axum integration for filtrate.
//!
//! This crate connects [`QueryStringService`] to the
//! [Axum](https://github.com/tokio-rs/axum) web framework.
//!
//! # Features
//!
//! - **Layer**: [`FiltrateLayer`] makes a service available to every handler
//! - **Extractor**: [`QueryFilter`] parses the request's query string
//! - **Rejection**: errors render as `{status, title, detail}` JSON
//!
//! # Example
//!
//! ```rust,no_run
//! use axum::{Json, Router, routing::get};
//! use filtrate_axum::prelude::*;
//!
//! async fn list_users(QueryFilter(query): QueryFilter) -> Json<ParsedQuery> {
//!     Json(query)
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let service = QueryStringService::new(
//!         QueryStringOptions::new().filter(
//!             FilterOptions::new().whitelist(["first", "last"]).allow("$in"),
//!         ),
//!     );
//!
//!     let app = Router::new()
//!         .route("/users", get(list_users))
//!         .layer(FiltrateLayer::new(service));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Json;
use axum::extract::FromRequestParts;
use axum::response::{IntoResponse, Response};
use http::request::Parts;
use http::{Request, StatusCode};
use thiserror::Error;
use tower_layer::Layer;
use tower_service::Service;
use tracing::{debug, info, warn};

pub use filtrate_query::prelude::*;
pub use filtrate_query::ErrorBody;

/// Errors that reject a request before the handler runs.
#[derive(Error, Debug)]
pub enum FiltrateRejection {
    /// The query string failed to parse.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// No service was installed for this route.
    #[error("no query-string service installed; add a FiltrateLayer to the router")]
    MissingService,
}

impl FiltrateRejection {
    /// The `{status, title, detail}` body sent to the client.
    pub fn to_body(&self) -> ErrorBody {
        match self {
            Self::Query(err) => err.to_body(),
            Self::MissingService => {
                QueryError::internal("query-string service unavailable").to_body()
            }
        }
    }
}

impl IntoResponse for FiltrateRejection {
    fn into_response(self) -> Response {
        let body = self.to_body();
        if body.status >= 500 {
            warn!(error = %self, "rejecting request");
        } else {
            debug!(error = %self, "rejecting request");
        }
        let status = StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}

/// Shared handle to a [`QueryStringService`].
#[derive(Debug, Clone, Default)]
pub struct FiltrateState(Arc<QueryStringService>);

impl FiltrateState {
    /// Wrap a service.
    pub fn new(service: QueryStringService) -> Self {
        Self(Arc::new(service))
    }

    /// The wrapped service.
    pub fn service(&self) -> &QueryStringService {
        &self.0
    }

    /// Parse the query string of a request.
    pub async fn parse(&self, parts: &Parts) -> Result<ParsedQuery, FiltrateRejection> {
        let raw = parts.uri.query().unwrap_or_default();
        Ok(self.0.parse_raw(raw, None).await?)
    }
}

impl From<QueryStringService> for FiltrateState {
    fn from(service: QueryStringService) -> Self {
        Self::new(service)
    }
}

/// Tower layer that installs a [`FiltrateState`] in request extensions.
#[derive(Debug, Clone)]
pub struct FiltrateLayer {
    state: FiltrateState,
}

impl FiltrateLayer {
    /// Create a layer for `service`.
    pub fn new(service: impl Into<FiltrateState>) -> Self {
        info!("FiltrateLayer created");
        Self {
            state: service.into(),
        }
    }

    /// The installed state.
    pub fn state(&self) -> &FiltrateState {
        &self.state
    }
}

impl<S> Layer<S> for FiltrateLayer {
    type Service = FiltrateMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        FiltrateMiddleware {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Tower middleware service created by [`FiltrateLayer`].
#[derive(Debug, Clone)]
pub struct FiltrateMiddleware<S> {
    inner: S,
    state: FiltrateState,
}

impl<S, ReqBody> Service<Request<ReqBody>> for FiltrateMiddleware<S>
where
    S: Service<Request<ReqBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        request.extensions_mut().insert(self.state.clone());
        self.inner.call(request)
    }
}

/// Extractor yielding the parsed filter and pagination of a request.
///
/// Requires a [`FiltrateLayer`] on the route.
#[derive(Debug, Clone)]
pub struct QueryFilter(pub ParsedQuery);

impl<S> FromRequestParts<S> for QueryFilter
where
    S: Send + Sync,
{
    type Rejection = FiltrateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = parts
            .extensions
            .get::<FiltrateState>()
            .cloned()
            .ok_or(FiltrateRejection::MissingService)?;
        state.parse(parts).await.map(QueryFilter)
    }
}

impl<S> FromRequestParts<S> for FiltrateState
where
    S: Send + Sync,
{
    type Rejection = FiltrateRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<FiltrateState>()
            .cloned()
            .ok_or(FiltrateRejection::MissingService)
    }
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        FiltrateLayer, FiltrateMiddleware, FiltrateRejection, FiltrateState, QueryFilter,
    };
    pub use filtrate_query::prelude::*;
}
