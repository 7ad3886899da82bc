use axum::response::Response;

use crate::error::ApiProblem;
use crate::services::hal::{HalCollection, HalEntity};

/// What a handler produced; decides how the response is rendered.
#[derive(Debug)]
pub enum Outcome {
    /// Decorated single item (200).
    Entity(HalEntity),
    /// Decorated single item that was just created (201 + Location).
    Created(HalEntity),
    /// Decorated collection (200).
    Collection(HalCollection),
    /// Structured error.
    Problem(ApiProblem),
    /// Already-built response (204, 405, ...), passed through untouched.
    Response(Response),
}

impl Outcome {
    pub fn is_problem(&self) -> bool {
        matches!(self, Outcome::Problem(_))
    }

    pub fn problem(&self) -> Option<&ApiProblem> {
        match self {
            Outcome::Problem(p) => Some(p),
            _ => None,
        }
    }

    pub fn entity(&self) -> Option<&HalEntity> {
        match self {
            Outcome::Entity(e) | Outcome::Created(e) => Some(e),
            _ => None,
        }
    }

    pub fn collection(&self) -> Option<&HalCollection> {
        match self {
            Outcome::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            Outcome::Response(r) => Some(r),
            _ => None,
        }
    }
}

impl From<ApiProblem> for Outcome {
    fn from(p: ApiProblem) -> Self {
        Outcome::Problem(p)
    }
}

impl From<Result<Outcome, ApiProblem>> for Outcome {
    fn from(result: Result<Outcome, ApiProblem>) -> Self {
        result.unwrap_or_else(Outcome::Problem)
    }
}
