//! API error mapping.
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}` with a
//! stable `code`. User-correctable problems are 4xx; storage and integrity
//! faults are 5xx.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::Serialize;
use std::fmt;
use todograph_core::{RepoError, TodoServiceError, TodoValidationError};

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request shape or rejected dependency set.
    Validation { code: &'static str, message: String },
    /// Resource not found.
    NotFound(String),
    /// Stored data violates an invariant.
    Integrity(String),
    /// Persistence is unreachable or failing.
    Upstream(String),
    /// Anything else.
    Internal(String),
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: "VALIDATION_ERROR",
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Integrity(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound(_) => "NOT_FOUND",
            Self::Integrity(_) => "DATA_INTEGRITY",
            Self::Upstream(_) => "UPSTREAM_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::Validation { message, .. } => message,
            Self::NotFound(message)
            | Self::Integrity(message)
            | Self::Upstream(message)
            | Self::Internal(message) => message,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(
                "event=api_error module=server status=error http_status={} error_code={} error={}",
                status.as_u16(),
                self.error_code(),
                self.message()
            );
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code(),
                message: self.message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<TodoValidationError> for ApiError {
    fn from(err: TodoValidationError) -> Self {
        TodoServiceError::Validation(err).into()
    }
}

impl From<TodoServiceError> for ApiError {
    fn from(err: TodoServiceError) -> Self {
        let message = err.to_string();
        match err {
            TodoServiceError::Validation(_) => Self::Validation {
                code: err.code(),
                message,
            },
            TodoServiceError::NotFound(_) => Self::NotFound(message),
            TodoServiceError::Integrity(_) | TodoServiceError::Repo(RepoError::InvalidData(_)) => {
                Self::Integrity(message)
            }
            TodoServiceError::Repo(_) => Self::Upstream(message),
            TodoServiceError::InconsistentState(_) => Self::Internal(message),
        }
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::ApiError;
    use axum::http::StatusCode;
    use todograph_core::db::DbError;
    use todograph_core::{GraphError, RepoError, TodoServiceError, TodoValidationError};

    #[test]
    fn cycle_rejection_is_a_client_error_with_its_own_code() {
        let err: ApiError = TodoValidationError::CyclicDependency(vec![1, 2, 1]).into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "CYCLIC_DEPENDENCY");
    }

    #[test]
    fn stored_cycle_is_a_server_fault() {
        let err: ApiError =
            TodoServiceError::Integrity(GraphError::CyclicDependency { path: vec![1, 1] }).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "DATA_INTEGRITY");
    }

    #[test]
    fn missing_task_is_not_found() {
        let err: ApiError = TodoServiceError::NotFound(9).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "NOT_FOUND: todo not found: 9");
    }

    #[test]
    fn storage_failure_is_upstream_unavailable() {
        let err: ApiError = TodoServiceError::Repo(RepoError::Db(DbError::Sqlite(
            rusqlite::Error::InvalidQuery,
        )))
        .into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), "UPSTREAM_UNAVAILABLE");
    }

    #[test]
    fn invalid_persisted_row_is_a_data_integrity_fault() {
        let err: ApiError =
            TodoServiceError::Repo(RepoError::InvalidData("empty title".to_string())).into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "DATA_INTEGRITY");
    }

    #[test]
    fn inconsistent_state_is_an_internal_error() {
        let err: ApiError = TodoServiceError::InconsistentState("read-back missing").into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }
}
