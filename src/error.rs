//! Error types for the layered cache
//!
//! Provides unified error handling using thiserror. Only write-path operations
//! return these; read paths degrade to a miss instead.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for stores, the orchestrator and the admin API.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in any layer
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Value could not be serialized for size accounting
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Stored value is not numeric
    #[error("Value at '{0}' is not a number")]
    NotANumber(String),

    /// Named layer is not registered
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// Layer name already registered
    #[error("Layer already registered: {0}")]
    DuplicateLayer(String),

    /// Named pattern is not registered
    #[error("Pattern not found: {0}")]
    PatternNotFound(String),

    /// Key pattern failed to compile
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// No enabled layer can take the write
    #[error("No available layer for key: {0}")]
    NoAvailableLayer(String),

    /// Value factory failed in get_or_set / warm-up
    #[error("Factory failed: {0}")]
    Factory(String),

    /// A layer backend failed (e.g. a remote layer)
    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_)
            | CacheError::LayerNotFound(_)
            | CacheError::PatternNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_)
            | CacheError::InvalidPattern(_)
            | CacheError::NotANumber(_) => StatusCode::BAD_REQUEST,
            CacheError::DuplicateLayer(_) => StatusCode::CONFLICT,
            CacheError::NoAvailableLayer(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Serialization(_)
            | CacheError::Factory(_)
            | CacheError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::LayerNotFound("L9".into()), StatusCode::NOT_FOUND),
            (CacheError::InvalidRequest("".into()), StatusCode::BAD_REQUEST),
            (CacheError::DuplicateLayer("L1".into()), StatusCode::CONFLICT),
            (
                CacheError::NoAvailableLayer("k".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                CacheError::Backend("down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_serde_error_converts() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let cache_err: CacheError = err.into();
        assert!(matches!(cache_err, CacheError::Serialization(_)));
    }
}
