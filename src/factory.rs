//! The factory capability.
//!
//! A [`Factory`] is the one collaborator the views need from the host: it
//! mints fresh raw messages and turns raw content into [`Body`] streams.
//! [`Response`](crate::Response) keeps one behind an `Arc` so it can
//! materialise string, byte and reader bodies.

use std::fmt;
use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use http::StatusCode;

use crate::body::{Body, Content};
use crate::error::Result;
use crate::message::{RawResponse, ServerRequest};

/// Produces raw requests, responses and streams.
pub trait Factory: Send + Sync {
    fn request(&self) -> ServerRequest;

    /// A response with `code`. An absent or empty `reason` lets the message
    /// pick the canonical phrase.
    fn response(&self, code: StatusCode, reason: Option<&str>) -> RawResponse;

    fn stream(&self, content: Content) -> Result<Body>;

    fn stream_from_file(&self, path: &Path, mode: &str) -> Result<Body>;
}

impl fmt::Debug for dyn Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn Factory")
    }
}

/// The built-in factory.
///
/// Requests start as an empty `GET /` over HTTP/1.1. Streams are kept in
/// memory, except for file streams which stay on disk until read.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFactory;

impl Factory for DefaultFactory {
    fn request(&self) -> ServerRequest {
        ServerRequest::default()
    }

    fn response(&self, code: StatusCode, reason: Option<&str>) -> RawResponse {
        RawResponse::new(code, reason)
    }

    fn stream(&self, content: Content) -> Result<Body> {
        match content {
            Content::Stream(body) => Ok(body),
            Content::Text(text) => Ok(Body::from(text)),
            Content::Bytes(bytes) => Ok(Body::from(bytes)),
            Content::Reader(mut reader) => {
                let mut buf = Vec::new();
                reader.read_to_end(&mut buf)?;
                Ok(Body::from(Bytes::from(buf)))
            }
        }
    }

    fn stream_from_file(&self, path: &Path, mode: &str) -> Result<Body> {
        Body::from_file(path, mode)
    }
}
