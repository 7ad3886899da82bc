//! Content negotiation for the resource route.
//!
//! Responsibility:
//! - Accept check (HAL JSON or anything JSON-compatible)
//! - Request body check / JSON decode for POST, PUT, PATCH
//! - Rendering an [`Outcome`] into the outgoing response
//!
//! Rejections here happen before the controller runs and short-circuit the
//! request with a problem response.

use axum::{
    Json,
    body::Bytes,
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use mime::Mime;
use serde_json::Value;

use crate::dispatch::Outcome;
use crate::error::ApiProblem;
use crate::services::hal::HAL_JSON;

fn parse_media(raw: &str) -> Option<Mime> {
    raw.trim().parse::<Mime>().ok()
}

// application/json, or any application/*+json such as application/hal+json.
fn is_json(media: &Mime) -> bool {
    media.type_() == mime::APPLICATION
        && (media.subtype() == mime::JSON || media.suffix() == Some(mime::JSON))
}

fn accepts_json(media: &Mime) -> bool {
    let any_subtype = media.subtype() == mime::STAR;
    (media.type_() == mime::STAR && any_subtype)
        || (media.type_() == mime::APPLICATION && any_subtype)
        || is_json(media)
}

/// Accept must allow a JSON representation; a missing header allows anything.
/// Entries that do not parse as media ranges are skipped.
pub fn check_accept(headers: &HeaderMap) -> Result<(), ApiProblem> {
    let Some(accept) = headers.get(header::ACCEPT) else {
        return Ok(());
    };
    let accept = accept.to_str().map_err(|_| not_acceptable())?;
    if accept.trim().is_empty() {
        return Ok(());
    }

    let acceptable = accept
        .split(',')
        .filter_map(parse_media)
        .any(|media| accepts_json(&media));
    if acceptable { Ok(()) } else { Err(not_acceptable()) }
}

fn not_acceptable() -> ApiProblem {
    ApiProblem::new(
        StatusCode::NOT_ACCEPTABLE,
        "Unable to resolve Accept header to a representation",
    )
}

fn carries_body(method: &Method) -> bool {
    ["POST", "PUT", "PATCH"]
        .iter()
        .any(|verb| method.as_str().eq_ignore_ascii_case(verb))
}

/// Decode the request body for methods that carry one.
///
/// Other methods ignore whatever body was sent.
pub fn parse_body(method: &Method, headers: &HeaderMap, body: &Bytes) -> Result<Option<Value>, ApiProblem> {
    if !carries_body(method) {
        return Ok(None);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_media);
    if !content_type.as_ref().is_some_and(is_json) {
        return Err(ApiProblem::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Invalid content-type specified",
        ));
    }

    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiProblem::new(
            StatusCode::BAD_REQUEST,
            "Request body is required",
        ));
    }

    serde_json::from_slice(body).map(Some).map_err(|e| {
        ApiProblem::new(StatusCode::BAD_REQUEST, format!("Malformed JSON: {e}"))
    })
}

/// Turn a controller outcome into the final response, forcing HAL JSON
/// for entities and collections.
pub fn render(outcome: Outcome) -> Response {
    match outcome {
        Outcome::Problem(problem) => problem.into_response(),
        Outcome::Entity(entity) => hal_json(StatusCode::OK, entity.to_json()),
        Outcome::Created(entity) => {
            let location = entity.self_href().to_string();
            (
                StatusCode::CREATED,
                [(header::CONTENT_TYPE, HAL_JSON)],
                [(header::LOCATION, location)],
                Json(entity.to_json()),
            )
                .into_response()
        }
        Outcome::Collection(collection) => match collection.render() {
            Ok(body) => hal_json(StatusCode::OK, body),
            Err(problem) => problem.into_response(),
        },
        Outcome::Response(response) => response,
    }
}

fn hal_json(status: StatusCode, body: Value) -> Response {
    (status, [(header::CONTENT_TYPE, HAL_JSON)], Json(body)).into_response()
}
