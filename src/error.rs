/*
 * Responsibility
 * - Structured Error (ApiProblem) の定義: status + detail
 * - IntoResponse 実装 (application/problem+json)
 * - BackendError → ApiProblem の変換 (status 正規化はここだけで行う)
 */
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repos::error::BackendError;

pub const PROBLEM_JSON: &str = "application/problem+json";

const PROBLEM_TYPE: &str = "http://www.w3.org/Protocols/rfc2616/rfc2616-sec10.html";

#[derive(Debug, Serialize)]
pub struct ProblemBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: String,
    pub status: u16,
    pub detail: String,
}

/// A failure that has been turned into a value: status code plus a
/// human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {detail}")]
pub struct ApiProblem {
    status: StatusCode,
    detail: String,
}

impl ApiProblem {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    /// Build a problem from a numeric code carried by a fault.
    ///
    /// Anything missing or outside `[100, 600)` becomes 500.
    pub fn from_code(code: Option<i64>, detail: impl Into<String>) -> Self {
        Self::new(normalize_status(code), detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn title(&self) -> String {
        self.status
            .canonical_reason()
            .unwrap_or("Unknown Status")
            .to_string()
    }

    pub fn body(&self) -> ProblemBody {
        ProblemBody {
            kind: PROBLEM_TYPE,
            title: self.title(),
            status: self.status.as_u16(),
            detail: self.detail.clone(),
        }
    }
}

pub fn normalize_status(code: Option<i64>) -> StatusCode {
    code.filter(|c| (100..600).contains(c))
        .and_then(|c| u16::try_from(c).ok())
        .and_then(|c| StatusCode::from_u16(c).ok())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for ApiProblem {
    fn into_response(self) -> Response {
        // A 1xx is not a final response; it goes out as a 500 with the same detail.
        let problem = if self.status.is_informational() {
            ApiProblem::new(StatusCode::INTERNAL_SERVER_ERROR, self.detail)
        } else {
            self
        };
        let status = problem.status;
        (status, [(header::CONTENT_TYPE, PROBLEM_JSON)], Json(problem.body())).into_response()
    }
}

impl From<BackendError> for ApiProblem {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Rejected(problem) => problem,
            BackendError::Fault { code, message } => {
                let problem = ApiProblem::from_code(code, message);
                if problem.status.is_server_error() {
                    tracing::warn!(?code, detail = %problem.detail, "resource backend fault");
                }
                problem
            }
        }
    }
}
