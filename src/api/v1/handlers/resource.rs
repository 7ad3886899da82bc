/*
 * Responsibility
 * - resource route (collection / item) の HTTP handler
 * - method gate (405) → negotiation (Accept / body) の順に前段チェック
 * - 前段で失敗したら controller を呼ばずにそのまま返す
 * - それ以外は ResourceController::dispatch → negotiation::render
 */
use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method},
    response::{IntoResponse, Response},
};

use crate::{
    dispatch::DispatchRequest,
    services::negotiation,
    state::AppState,
};

pub async fn collection(
    State(state): State<AppState>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state, method, None, query, &headers, &body).await
}

pub async fn item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    dispatch(&state, method, Some(id), query, &headers, &body).await
}

async fn dispatch(
    state: &AppState,
    method: Method,
    id: Option<String>,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: &Bytes,
) -> Response {
    let method = canonical(method);

    // The gate answers first: a disallowed method is a 405 whatever the body looks like.
    if method != Method::OPTIONS
        && let Some(rejection) = state.controller.gate(&method, id.is_some())
    {
        return rejection;
    }

    // Upstream rejection: render it as is, the controller never runs.
    let body = match negotiation::check_accept(headers)
        .and_then(|()| negotiation::parse_body(&method, headers, body))
    {
        Ok(body) => body,
        Err(problem) => {
            tracing::debug!(%method, status = %problem.status(), "rejected before dispatch");
            return problem.into_response();
        }
    };

    let outcome = state
        .controller
        .dispatch(DispatchRequest {
            method,
            id,
            query,
            body,
        })
        .await;

    negotiation::render(outcome)
}

// `post` and `POST` are the same verb from here on.
fn canonical(method: Method) -> Method {
    let upper = method.as_str().to_ascii_uppercase();
    if upper == method.as_str() {
        return method;
    }
    Method::from_bytes(upper.as_bytes()).unwrap_or(method)
}
