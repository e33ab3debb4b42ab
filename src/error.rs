//! Error types for the cache coordinator
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for the cache coordinator.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Transport failure or timeout talking to a store or remote collaborator
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Missing or invalid required field
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// Eviction policy string did not name a known policy
    #[error("Unknown eviction policy: {0}")]
    PolicyUnknown(String),

    /// Victim vanished between selection and delete
    #[error("Eviction race lost: {0}")]
    EvictionRaceLost(String),

    /// Entity absent from every store that was consulted
    #[error("Not found: {0}")]
    NotFound(String),

    /// Over capacity and no victim could be selected
    #[error("Cache full: {0}")]
    CacheFull(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::PolicyUnknown(_) => StatusCode::BAD_REQUEST,
            CacheError::EvictionRaceLost(_) => StatusCode::CONFLICT,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::CacheFull(_) => StatusCode::SERVICE_UNAVAILABLE,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache coordinator.
pub type Result<T> = std::result::Result<T, CacheError>;
