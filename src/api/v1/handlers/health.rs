/*
 * Responsibility
 * - GET /health (疎通用)
 * - どの resource route を配信しているかも返す
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "resource": state.controller.route().name(),
        })),
    )
}
