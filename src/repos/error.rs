/*
 * Responsibility
 * - backend が上位 (dispatch) に伝える失敗の意味の定義
 *   - Fault: 任意の status code を持ちうる障害
 *   - Rejected: backend 自身が組み立てた ApiProblem (そのまま返す)
 */
use thiserror::Error;

use crate::error::ApiProblem;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend fault: {message}")]
    Fault { code: Option<i64>, message: String },
    #[error(transparent)]
    Rejected(ApiProblem),
}

pub type BackendResult<T> = Result<T, BackendError>;

impl BackendError {
    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            code: None,
            message: message.into(),
        }
    }

    pub fn fault_with_code(code: i64, message: impl Into<String>) -> Self {
        Self::Fault {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::fault_with_code(400, message)
    }
}

impl From<ApiProblem> for BackendError {
    fn from(p: ApiProblem) -> Self {
        Self::Rejected(p)
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(e: sqlx::Error) -> Self {
        Self::fault(e.to_string())
    }
}
