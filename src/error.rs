//! Error types for the sprite cache
//!
//! Provides the fetch/decode/load taxonomy and the HTTP-facing error,
//! all built on thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Fetch Error ==
/// Failure reported by a byte-fetch collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS, TLS or body read failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status code
    #[error("unexpected status: {0}")]
    Status(u16),

    /// The fetch was cancelled before it completed
    #[error("fetch cancelled")]
    Cancelled,
}

// == Decode Error ==
/// The fetched payload could not be interpreted as the expected resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload is empty")]
    Empty,

    #[error("payload does not carry a PNG signature")]
    InvalidSignature,

    #[error("payload is truncated")]
    Truncated,

    #[error("malformed payload: {0}")]
    Malformed(String),
}

// == Load Error ==
/// Outcome of a failed `load`, fanned out to every waiter of a fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The waiter's own token was cancelled
    #[error("load cancelled")]
    Cancelled,
}

// == Api Error Enum ==
/// Error type for the HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Sprite could not be loaded
    #[error("Sprite {id} unavailable: {source}")]
    Load {
        id: u32,
        #[source]
        source: LoadError,
    },
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Load { source, .. } => match source {
                LoadError::Fetch(FetchError::Status(404)) => StatusCode::NOT_FOUND,
                LoadError::Fetch(FetchError::Cancelled) | LoadError::Cancelled => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                LoadError::Fetch(_) => StatusCode::BAD_GATEWAY,
                LoadError::Decode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            },
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;
