/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health と、設定された resource route の collection / item path
 * - resource route は any() で全 method を受け、許可判定は ResourceController に任せる
 */
use axum::{
    Router,
    routing::{any, get},
};

use crate::dispatch::ResourceRoute;
use crate::state::AppState;

use crate::api::v1::handlers::{
    health::health,
    resource::{collection, item},
};

pub fn routes(route: &ResourceRoute) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(&route.collection_path(), any(collection))
        .route(&route.item_path(), any(item))
}
