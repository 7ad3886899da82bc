//! Browser CORS policy for the resource route.
//!
//! - Origins: any origin outside production, the `CORS_ALLOWED_ORIGINS`
//!   allowlist (exact match) in production. No credentials either way.
//! - Methods: whatever the resource can actually answer, i.e. both method
//!   sets plus HEAD and OPTIONS.
//! - `Location` (201) and `Allow` (405 / OPTIONS) are readable from scripts.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;
use crate::middleware::http::REQUEST_ID_HEADER;

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(600);

pub fn allowed_methods(config: &Config) -> Vec<Method> {
    let configured = config
        .collection_methods
        .iter()
        .chain(config.entity_methods.iter())
        .filter_map(|name| Method::from_bytes(name.as_bytes()).ok());

    let mut methods = vec![Method::HEAD, Method::OPTIONS];
    for method in configured {
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    methods
}

fn allowed_origins(config: &Config) -> AllowOrigin {
    if !config.app_env.is_production() {
        return AllowOrigin::any();
    }
    // An empty allowlist admits no origin; a wildcard entry is never honored here.
    let list: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter(|origin| origin.as_str() != "*")
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    AllowOrigin::list(list)
}

pub fn apply(router: Router, config: &Config) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(config))
        .allow_methods(allowed_methods(config))
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, request_id.clone()])
        .expose_headers([header::LOCATION, header::ALLOW, request_id])
        .max_age(PREFLIGHT_MAX_AGE);

    router.layer(cors)
}
