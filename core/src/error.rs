//! Error types for the items API client.
//!
//! # Design
//! Each status the server documents gets its own variant carrying the
//! server's `{"error": ...}` message. `Validation` is raised locally, before
//! any request is built.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Input rejected on the client side; nothing was sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// 400 from the server.
    #[error("bad request: {0}")]
    InvalidArgument(String),

    /// 404 from the server.
    #[error("not found: {0}")]
    NotFound(String),

    /// 405 from the server.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Any other unexpected status.
    #[error("HTTP {status}: {message}")]
    HttpError { status: u16, message: String },

    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    #[error("serialization failed: {0}")]
    SerializationError(String),
}
