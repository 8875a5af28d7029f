//! HTTP error taxonomy: one enum, one `IntoResponse` impl, a uniform
//! `{error, code}` JSON body. `StoreError` maps in via `From`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::StoreError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    NotFound(String),
    Conflict(String),
    IllegalTransition(String),
    Unauthorized(String),
    Forbidden(String),
    AccountLocked(String),
    Overloaded,
    Timeout,
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(msg) => Self::Validation(msg),
            StoreError::NotFound(kind, id) => Self::NotFound(format!("{kind} '{id}' not found")),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::IllegalTransition(msg) => Self::IllegalTransition(msg),
            StoreError::Overloaded => Self::Overloaded,
            StoreError::Timeout(_) => Self::Timeout,
            StoreError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            Self::IllegalTransition(msg) => (StatusCode::CONFLICT, "ILLEGAL_TRANSITION", msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            Self::AccountLocked(msg) => (StatusCode::LOCKED, "ACCOUNT_LOCKED", msg),
            Self::Overloaded => (
                StatusCode::SERVICE_UNAVAILABLE,
                "OVERLOADED",
                "ingestion buffer full".to_string(),
            ),
            Self::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "TIMEOUT",
                "operation exceeded its deadline".to_string(),
            ),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg),
        };

        let body = ErrorBody {
            code,
            message,
            details: None,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_not_found_maps_to_404_taxonomy() {
        let mapped: ApiError = StoreError::NotFound("Job", "J1".into()).into();
        assert!(matches!(mapped, ApiError::NotFound(_)));
    }
}
