//! Transport-level middleware wrapped around the whole router.
//!
//! Responsibility:
//! - X-Request-Id: generated when absent, echoed on the response, recorded on the trace span
//! - Request body cap (`BODY_LIMIT_BYTES`)
//! - Per-request deadline (`REQUEST_TIMEOUT_SECS`), answered as a 408 problem
//! - Access log span per request

use axum::Router;
use axum::body::Body;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Request, StatusCode, header::HeaderName};
use axum::response::{IntoResponse, Response};
use tower::timeout::{TimeoutLayer, error::Elapsed};
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::config::Config;
use crate::error::ApiProblem;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Errors surfacing from the tower stack (timeouts mostly) become problems,
/// so every failure the client sees has the same shape.
async fn handle_stack_error(err: BoxError) -> Response {
    if err.is::<Elapsed>() {
        return ApiProblem::new(StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response();
    }
    tracing::error!(error = %err, "unhandled middleware error");
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    ApiProblem::new(status, status.canonical_reason().unwrap_or_default()).into_response()
}

fn request_span(req: &Request<Body>) -> Span {
    let request_id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        request_id,
    )
}

pub fn apply(router: Router, config: &Config) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    // Outermost first: the id must exist before the span and the handler see the request.
    let stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_stack_error))
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(TraceLayer::new_for_http().make_span_with(request_span))
        .layer(RequestBodyLimitLayer::new(config.body_limit_bytes))
        .layer(TimeoutLayer::new(config.request_timeout));

    router.layer(stack)
}
