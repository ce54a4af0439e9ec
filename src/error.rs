//! Unified error type.

use std::path::PathBuf;

use thiserror::Error;

/// The error type returned by veneer's fallible operations.
///
/// Every variant surfaces synchronously to the immediate caller. Nothing in
/// this crate turns an `Error` into an HTTP response on its own; translate
/// them (for example into an [`HttpError`](crate::HttpError)) where it makes
/// sense for your application.
#[derive(Debug, Error)]
pub enum Error {
    /// A flat-map lookup missed and no default was supplied.
    #[error("{0}")]
    NotFound(String),

    /// An uploaded-file key path does not resolve.
    #[error("{0}")]
    OutOfBounds(String),

    /// A mandatory argument was omitted.
    #[error("{0}")]
    Required(String),

    /// More than one candidate where exactly one was expected.
    #[error("{0}")]
    Conflict(String),

    /// Incompatible argument forms were mixed.
    #[error("{0}")]
    InvalidArgument(String),

    /// A collaborator the operation depends on was not provided.
    #[error("{0}")]
    Precondition(String),

    /// A file response names a path that is not a regular file.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The request body is not valid JSON.
    #[error("malformed json body: {0}")]
    Malformed(#[source] serde_json::Error),

    /// A response payload could not be encoded as JSON.
    #[error("json encoding failed: {0}")]
    Json(#[source] serde_json::Error),

    /// A header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<http::header::InvalidHeaderName> for Error {
    fn from(e: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(e.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(e.to_string())
    }
}
