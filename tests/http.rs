use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use resource_dispatch::app::{build_router, build_state};
use resource_dispatch::config::Config;
use resource_dispatch::repos::{MemoryBackend, ResourceBackend};

fn config(extra: &[(&str, &str)]) -> Config {
    let mut env: HashMap<String, String> = HashMap::from([
        ("RESOURCE_ROUTE".to_string(), "widgets".to_string()),
        ("PUBLIC_BASE_URL".to_string(), "http://api.test".to_string()),
        ("COLLECTION_HTTP_METHODS".to_string(), "GET,POST,DELETE".to_string()),
        ("ENTITY_HTTP_METHODS".to_string(), "GET,PATCH,PUT,DELETE".to_string()),
    ]);
    for (k, v) in extra {
        env.insert(k.to_string(), v.to_string());
    }
    Config::from_lookup(|key| env.get(key).cloned()).unwrap()
}

fn app_with(config: &Config) -> (axum::Router, MemoryBackend) {
    let backend = MemoryBackend::new(config.route.identifier_name());
    let state = build_state(config, Arc::new(backend.clone())).unwrap();
    (build_router(state, config), backend)
}

fn app() -> (axum::Router, MemoryBackend) {
    app_with(&config(&[]))
}

async fn body_json(resp: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn health_reports_resource() {
    let (app, _) = app();
    let resp = app.oneshot(empty_request("GET", "/api/v1/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"status": "ok", "resource": "widgets"}));
}

#[tokio::test]
async fn create_then_fetch_round_trip() {
    let (app, _) = app();

    let resp = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/widgets", json!({"id": "w1", "name": "gear"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
        resp.headers()[header::LOCATION],
        "http://api.test/api/v1/widgets/w1"
    );
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/hal+json");
    let created = body_json(resp).await;
    assert_eq!(created["_links"]["self"]["href"], "http://api.test/api/v1/widgets/w1");

    let resp = app
        .oneshot(empty_request("GET", "/api/v1/widgets/w1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched = body_json(resp).await;
    assert_eq!(fetched["name"], "gear");
    assert_eq!(fetched["id"], "w1");
}

#[tokio::test]
async fn missing_item_is_problem_json_404() {
    let (app, _) = app();
    let resp = app
        .oneshot(empty_request("GET", "/api/v1/widgets/nope"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/problem+json");
    let body = body_json(resp).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["title"], "Not Found");
    assert_eq!(body["detail"], "Resource not found.");
}

#[tokio::test]
async fn disallowed_method_is_405_with_allow_header() {
    let (app, backend) = app_with(&config(&[("ENTITY_HTTP_METHODS", "get")]));
    backend.create(json!({"id": "w1"})).await.unwrap();

    let resp = app
        .oneshot(json_request("PUT", "/api/v1/widgets/w1", json!({"name": "x"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()[header::ALLOW], "GET");
}

#[tokio::test]
async fn options_returns_allow_for_collection_and_item() {
    let (app, _) = app();

    let resp = app
        .clone()
        .oneshot(empty_request("OPTIONS", "/api/v1/widgets"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers()[header::ALLOW], "GET, POST, DELETE");

    let resp = app
        .clone()
        .oneshot(empty_request("OPTIONS", "/api/v1/widgets/w1"))
        .await
        .unwrap();
    assert_eq!(resp.headers()[header::ALLOW], "GET, PUT, DELETE, PATCH");

    let resp = app
        .oneshot(empty_request("OPTIONS", "/api/v1/widgets?id=w1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(resp.headers()[header::ALLOW], "GET, PUT, DELETE, PATCH");
}

#[tokio::test]
async fn collection_is_paginated_hal() {
    let (app, backend) = app_with(&config(&[
        ("PAGE_SIZE", "2"),
        ("PAGE_SIZE_PARAM", "per_page"),
        ("COLLECTION_NAME", "widget"),
    ]));
    for i in 1..=5 {
        backend.create(json!({"id": format!("w{i}")})).await.unwrap();
    }

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/widgets?page=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["page_size"], 2);
    assert_eq!(body["page_count"], 3);
    assert_eq!(body["total_items"], 5);
    let embedded = body["_embedded"]["widget"].as_array().unwrap();
    assert_eq!(embedded.len(), 2);
    assert_eq!(embedded[0]["id"], "w3");
    assert_eq!(
        body["_links"]["next"]["href"],
        "http://api.test/api/v1/widgets?page=3&per_page=2"
    );

    let resp = app
        .clone()
        .oneshot(empty_request("GET", "/api/v1/widgets?per_page=5"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["page_size"], 5);
    assert_eq!(body["_embedded"]["widget"].as_array().unwrap().len(), 5);

    let resp = app
        .oneshot(empty_request("GET", "/api/v1/widgets?page=9"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn patch_and_delete_item() {
    let (app, backend) = app();
    backend.create(json!({"id": "w1", "name": "old", "size": 3})).await.unwrap();

    let resp = app
        .clone()
        .oneshot(json_request("PATCH", "/api/v1/widgets/w1", json!({"name": "new"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["name"], "new");
    assert_eq!(body["size"], 3);

    let resp = app
        .clone()
        .oneshot(empty_request("DELETE", "/api/v1/widgets/w1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Nothing left to delete: an empty delete is a 422, not a 204.
    let resp = app
        .oneshot(empty_request("DELETE", "/api/v1/widgets/w1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn invalid_payload_fault_becomes_400() {
    let (app, _) = app();
    let resp = app
        .oneshot(json_request("POST", "/api/v1/widgets", json!([1, 2, 3])))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["detail"], "Invalid payload: expected a JSON object");
}

#[tokio::test]
async fn upstream_rejections_short_circuit() {
    let (app, backend) = app();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/widgets")
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_ACCEPTABLE);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/problem+json");

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/widgets")
                .header(header::CONTENT_TYPE, "text/plain")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/widgets")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    assert_eq!(backend.count().await, 0);
}

#[tokio::test]
async fn responses_carry_request_id() {
    let (app, _) = app();
    let resp = app
        .oneshot(empty_request("GET", "/api/v1/widgets"))
        .await
        .unwrap();
    assert!(resp.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn disallowed_method_is_405_before_body_checks() {
    let (app, backend) = app_with(&config(&[
        ("ENTITY_HTTP_METHODS", "GET"),
        ("COLLECTION_HTTP_METHODS", "GET"),
    ]));

    // No body and no content type.
    let resp = app
        .clone()
        .oneshot(empty_request("PUT", "/api/v1/widgets/w1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()[header::ALLOW], "GET");

    // JSON content type, empty body.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/v1/widgets/w1")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    // Unacceptable Accept does not outrank the gate either.
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/widgets")
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(resp.headers()[header::ALLOW], "GET");

    assert_eq!(backend.count().await, 0);
}

#[tokio::test]
async fn lowercase_post_creates_with_its_body() {
    let (app, backend) = app();
    let resp = app
        .oneshot(json_request("post", "/api/v1/widgets", json!({"id": "a"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(resp.headers()[header::LOCATION], "http://api.test/api/v1/widgets/a");
    assert!(backend.fetch("a").await.unwrap().is_some());
}
