//! GraphQL HTTP handler and request context
//!
//! Provides helpers for:
//! - Extracting the viewer id and request id from HTTP headers
//! - Exposing them to resolvers as [`RequestContext`]
//! - Standard Axum handler executing a dynamic schema

use async_graphql::dynamic::Schema;
use async_graphql::{Context, Request, Response};
use axum::{extract::Extension, http::HeaderMap, Json};
use uuid::Uuid;

/// Header carrying the authenticated viewer
pub const VIEWER_ID_HEADER: &str = "x-user-id";

/// Header carrying the caller's correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request data available to node, connection and mutation callbacks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub viewer_id: Option<Uuid>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            viewer_id: extract_viewer_id(headers),
            request_id: extract_request_id(headers),
        }
    }
}

/// Extract the viewer id from the `x-user-id` header
pub fn extract_viewer_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(VIEWER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
}

/// Extract the request id from the `x-request-id` header
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Standard GraphQL handler with request context injection
///
/// # Example
///
/// ```rust,no_run
/// use axum::{Extension, Router, routing::post};
/// use pleme_graphql_relay::server::graphql_handler;
/// use async_graphql::dynamic::Schema;
///
/// # fn example(schema: Schema) {
/// let app: Router = Router::new()
///     .route("/graphql", post(graphql_handler))
///     .layer(Extension(schema));
/// # }
/// ```
pub async fn graphql_handler(
    Extension(schema): Extension<Schema>,
    headers: HeaderMap,
    req: Json<Request>,
) -> Json<Response> {
    let context = RequestContext::from_headers(&headers);
    tracing::debug!(
        viewer_id = ?context.viewer_id,
        request_id = ?context.request_id,
        "executing GraphQL request"
    );

    let request = req.0.data(context);
    let response = schema.execute(request).await;

    Json(response)
}

/// Get the [`RequestContext`] from a resolver context
///
/// Requests executed outside [`graphql_handler`] get an empty context.
pub fn request_context(ctx: &Context<'_>) -> RequestContext {
    ctx.data_opt::<RequestContext>()
        .cloned()
        .unwrap_or_default()
}
