//! # veneer
//!
//! Request and response views over immutable HTTP messages.
//! A thin layer. Nothing underneath is replaced.
//!
//! ## The contract
//!
//! The host owns HTTP: parsing, header storage, body streams, multipart
//! decoding, the wire. veneer owns none of that. It wraps the host's raw
//! message values and gives them accessors you would otherwise write in every
//! handler.
//!
//! What the host hands over:
//!
//! - **Raw messages**: [`ServerRequest`] and [`RawResponse`], immutable
//!   values built on the [`http`] crate. Every `with_*` call returns a new one.
//! - **A [`Factory`]**: mints raw messages and turns strings, bytes and
//!   readers into [`Body`] streams.
//!
//! What veneer adds on top:
//!
//! - [`Request`]: fail-fast lookups for query parameters, form fields,
//!   cookies, server parameters and attributes, JSON bodies, and walks through
//!   nested uploaded files
//! - [`Response`]: status/header/body chains, `html`/`text`/`json`
//!   shortcuts, file responses, downloads and sendfile offload
//! - [`Middleware`](middleware::Middleware): one stage of a pipeline, plus
//!   the adapter to the host's [`RequestHandler`]
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use http::StatusCode;
//! use veneer::{DefaultFactory, Request, Response, ServerRequest};
//!
//! let raw = ServerRequest::from_http(
//!     http::Request::get("http://www.example.com/albums?year=1988")
//!         .body(bytes::Bytes::new())
//!         .unwrap(),
//! );
//! let req = Request::new(raw);
//!
//! let year = req.param("year")?;
//! let sort = req.param_or("sort", "title");
//!
//! let mut res = Response::from_factory(Arc::new(DefaultFactory));
//! res.json(&serde_json::json!({"year": year, "sort": sort}), StatusCode::OK, None)?;
//!
//! assert_eq!(req.origin(), "http://www.example.com");
//! assert_eq!(res.get_body().to_string_lossy()?, r#"{"year":"1988","sort":"title"}"#);
//! # Ok::<(), veneer::Error>(())
//! ```
//!
//! ## Threading
//!
//! A view belongs to one request-handling call stack. Raw snapshots are
//! `Send + Sync` and safe to read from anywhere; views are mutated through
//! `&mut self` and are not meant to be shared.

mod body;
mod error;
mod factory;
mod handler;
mod http_error;
mod message;
mod request;
mod response;
mod sniff;

pub mod middleware;

pub use body::{Body, Content};
pub use error::{Error, Result};
pub use factory::{DefaultFactory, Factory};
pub use handler::RequestHandler;
pub use http_error::HttpError;
pub use message::{FileTree, Params, RawResponse, ServerRequest, UploadedFile, UploadedNode};
pub use request::{Key, Request};
pub use response::Response;
pub use sniff::{Sniffed, sniff, sniff_file};
