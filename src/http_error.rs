//! HTTP error values.
//!
//! An [`HttpError`] is something a handler can return or raise to say "answer
//! this request with status X". It carries an optional JSON payload for the
//! error page or API body. Turning it into a response is up to the host.

use std::fmt;

use http::StatusCode;
use serde_json::Value;

/// An error that maps onto an HTTP status.
#[derive(Clone, Debug)]
pub struct HttpError {
    status: StatusCode,
    message: String,
    payload: Option<Value>,
}

impl HttpError {
    /// An error for `status`, with the canonical reason as its message.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            message: status.canonical_reason().unwrap_or_default().to_owned(),
            payload: None,
        }
    }

    pub fn bad_request() -> Self { Self::new(StatusCode::BAD_REQUEST) }
    pub fn unauthorized() -> Self { Self::new(StatusCode::UNAUTHORIZED) }
    pub fn forbidden() -> Self { Self::new(StatusCode::FORBIDDEN) }
    pub fn not_found() -> Self { Self::new(StatusCode::NOT_FOUND) }
    pub fn method_not_allowed() -> Self { Self::new(StatusCode::METHOD_NOT_ALLOWED) }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Value>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn message(&self) -> &str { &self.message }
    pub fn payload(&self) -> Option<&Value> { self.payload.as_ref() }

    /// `"<code> <message>"`, e.g. `"404 Not Found"`.
    pub fn title(&self) -> String {
        format!("{} {}", self.status.as_u16(), self.message)
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

impl std::error::Error for HttpError {}
