//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer and its collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key not present in the cache nor in the backing store
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Failure reported by the backing store collaborator
    #[error("Backing store error: {0}")]
    Backend(String),

    /// The cache or adapter has already been disposed
    #[error("Cache disposed: {0}")]
    Disposed(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Backend(_) => StatusCode::BAD_GATEWAY,
            CacheError::Disposed(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
