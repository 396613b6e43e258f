//! Error types for the invoicing API client.
//!
//! # Design
//! Every non-2xx response lands in `Request`, distinguished only by its
//! message: the server's `detail` string when it sent one, otherwise a
//! synthesized `HTTP {status}: {status_text}` line. The remaining variants
//! mark the other boundaries a call can fail at: encoding the payload,
//! moving bytes over the wire, and decoding a success body into the
//! caller's type.

use thiserror::Error;

/// Errors returned by `ApiClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    #[error("{message}")]
    Request { status: u16, message: String },

    /// A success body could not be decoded into the expected type.
    #[error("malformed response body: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The transport failed before a response arrived.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    /// HTTP status of a `Request` failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }
}
