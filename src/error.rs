//! Crate-wide error taxonomy.
//!
//! `StoreError` covers persistence-layer failures; it is mapped
//! onto the wire-level taxonomy by `crate::api::error::ApiError`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} '{1}' not found")]
    NotFound(&'static str, String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("illegal transition: {0}")]
    IllegalTransition(String),

    #[error("ingestion buffer overloaded")]
    Overloaded,

    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::Internal(format!("lock poisoned: {err}"))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("invalid JSON: {err}"))
    }
}
