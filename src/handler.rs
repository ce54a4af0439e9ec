//! The host's request-handler protocol.
//!
//! This is the interface a host runtime speaks: raw request in, raw response
//! out. Middleware sits in front of a [`RequestHandler`] and only ever sees
//! views; [`Middleware::process`](crate::middleware::Middleware::process)
//! translates between the two.
//!
//! ```text
//! ServerRequest ──► Request ──► Middleware::handle ──► next(Request)
//!                                                        │ into_raw
//!                                                        ▼
//!                                           RequestHandler::handle
//!                                                        │ RawResponse
//! RawResponse ◄── Response ◄────────────────────────────┘ Response::new
//! ```

use crate::error::Result;
use crate::message::{RawResponse, ServerRequest};

/// Turns a raw request into a raw response.
///
/// Implemented for every `Fn(ServerRequest) -> Result<RawResponse>`, so a
/// closure is usually all you need:
///
/// ```rust
/// use veneer::{RawResponse, RequestHandler, ServerRequest};
///
/// let handler = |_req: ServerRequest| -> veneer::Result<RawResponse> { Ok(RawResponse::default()) };
/// let res = handler.handle(ServerRequest::default())?;
/// assert_eq!(res.status(), 200);
/// # Ok::<(), veneer::Error>(())
/// ```
pub trait RequestHandler {
    fn handle(&self, request: ServerRequest) -> Result<RawResponse>;
}

impl<F> RequestHandler for F
where
    F: Fn(ServerRequest) -> Result<RawResponse>,
{
    fn handle(&self, request: ServerRequest) -> Result<RawResponse> {
        self(request)
    }
}
