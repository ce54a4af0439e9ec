//! Middleware.
//!
//! A middleware stage sees the request as a [`Request`] view, may change it,
//! hands it to `next`, and may change the [`Response`] it gets back. `next` is
//! a plain function value; stacking stages is nested composition and is left
//! to the host's dispatcher.
//!
//! ```rust
//! use veneer::middleware::{self, Middleware, Next};
//! use veneer::{Body, RawResponse, Request, Response, ServerRequest};
//!
//! let stamp = middleware::from_fn(|mut req: Request, next: &Next<'_>| {
//!     req.set("stage", "seen");
//!     let mut res = next(req)?;
//!     res.set_version(http::Version::HTTP_2);
//!     Ok(res)
//! });
//!
//! let handler = |req: ServerRequest| -> veneer::Result<RawResponse> {
//!     let stage = req.attributes()["stage"].as_str().unwrap_or_default().to_owned();
//!     Ok(RawResponse::default().with_body(Body::from(stage)))
//! };
//!
//! let res = stamp.process(ServerRequest::default(), &handler)?;
//! assert_eq!(res.body().to_string_lossy()?, "seen");
//! assert_eq!(res.version(), http::Version::HTTP_2);
//! # Ok::<(), veneer::Error>(())
//! ```

use tracing::debug;

use crate::error::Result;
use crate::handler::RequestHandler;
use crate::message::{RawResponse, ServerRequest};
use crate::request::Request;
use crate::response::Response;

/// The continuation a stage calls to run the rest of the chain.
pub type Next<'a> = dyn Fn(Request) -> Result<Response> + 'a;

/// One stage of a request pipeline.
pub trait Middleware {
    fn handle(&self, request: Request, next: &Next<'_>) -> Result<Response>;

    /// Runs this stage in front of a raw `handler`.
    ///
    /// The raw request is wrapped for [`handle`](Self::handle); `next` unwraps
    /// it, calls `handler`, and wraps the result without a factory. The final
    /// view is unwrapped again for the host.
    fn process(&self, request: ServerRequest, handler: &dyn RequestHandler) -> Result<RawResponse> {
        debug!(method = %request.method(), target = %request.request_target(), "middleware process");

        let next = |req: Request| handler.handle(req.into_raw()).map(Response::new);
        self.handle(Request::new(request), &next).map(Response::into_raw)
    }
}

/// Middleware built from a closure. See [`from_fn`].
#[derive(Clone, Copy, Debug)]
pub struct FromFn<F>(F);

/// Turns `f` into a [`Middleware`].
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: Fn(Request, &Next<'_>) -> Result<Response>,
{
    FromFn(f)
}

impl<F> Middleware for FromFn<F>
where
    F: Fn(Request, &Next<'_>) -> Result<Response>,
{
    fn handle(&self, request: Request, next: &Next<'_>) -> Result<Response> {
        (self.0)(request, next)
    }
}
