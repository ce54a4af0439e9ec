//! The response view.
//!
//! [`Response`] wraps one immutable [`RawResponse`] and lets you build it up
//! in a chain: status, headers, body, and a handful of shortcuts for the
//! bodies you send most often.
//!
//! String, byte and reader bodies have to become a stream first, which is the
//! job of a [`Factory`]. A response without one can still take ready-made
//! [`Body`] values; anything else fails with [`Error::Precondition`].
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use http::StatusCode;
//! use veneer::{DefaultFactory, Response};
//!
//! let mut res = Response::from_factory(Arc::new(DefaultFactory));
//! res.json(&[1, 2, 3], StatusCode::OK, None)?;
//!
//! assert_eq!(res.get_header("content-type"), ["application/json"]);
//! assert_eq!(res.get_body().to_string_lossy()?, "[1,2,3]");
//! # Ok::<(), veneer::Error>(())
//! ```

use std::path::Path;
use std::sync::Arc;

use http::header::{
    CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HeaderName, HeaderValue, LOCATION,
};
use http::{StatusCode, Version};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::body::{Body, Content};
use crate::error::{Error, Result};
use crate::factory::Factory;
use crate::message::{RawResponse, header_pair};
use crate::sniff::sniff_file;

const CONTENT_TRANSFER_ENCODING: HeaderName = HeaderName::from_static("content-transfer-encoding");
const X_ACCEL_REDIRECT: HeaderName = HeaderName::from_static("x-accel-redirect");
const X_SENDFILE: HeaderName = HeaderName::from_static("x-sendfile");

/// A mutable façade over an immutable [`RawResponse`].
#[derive(Clone, Debug)]
pub struct Response {
    raw: RawResponse,
    factory: Option<Arc<dyn Factory>>,
    server_software: Option<String>,
}

impl Response {
    /// Wraps `raw` without a factory.
    pub fn new(raw: RawResponse) -> Self {
        Self { raw, factory: None, server_software: None }
    }

    pub fn with_factory(raw: RawResponse, factory: Arc<dyn Factory>) -> Self {
        Self { raw, factory: Some(factory), server_software: None }
    }

    /// A fresh `200 OK` response minted by `factory`, which stays attached.
    pub fn from_factory(factory: Arc<dyn Factory>) -> Self {
        let raw = factory.response(StatusCode::OK, None);
        Self::with_factory(raw, factory)
    }

    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn into_raw(self) -> RawResponse {
        self.raw
    }

    /// Replaces the wrapped snapshot. The factory stays.
    pub fn wrap(&mut self, raw: RawResponse) -> &mut Self {
        self.raw = raw;
        self
    }

    pub fn set_factory(&mut self, factory: Arc<dyn Factory>) -> &mut Self {
        self.factory = Some(factory);
        self
    }

    pub fn factory(&self) -> Option<&Arc<dyn Factory>> {
        self.factory.as_ref()
    }

    /// Overrides the server software string [`sendfile`](Self::sendfile)
    /// inspects. Without it the `SERVER_SOFTWARE` environment variable is
    /// used.
    pub fn server_software(&mut self, software: impl Into<String>) -> &mut Self {
        self.server_software = Some(software.into());
        self
    }

    fn update(&mut self, f: impl FnOnce(RawResponse) -> RawResponse) -> &mut Self {
        let raw = std::mem::take(&mut self.raw);
        self.raw = f(raw);
        self
    }

    // ── Status line ───────────────────────────────────────────────────────────

    /// Sets the status. Without a reason (or with an empty one) the canonical
    /// phrase for `code` is used.
    pub fn status(&mut self, code: StatusCode, reason: Option<&str>) -> &mut Self {
        self.update(|raw| raw.with_status(code, reason))
    }

    pub fn status_code(&self) -> StatusCode {
        self.raw.status()
    }

    pub fn reason_phrase(&self) -> &str {
        self.raw.reason_phrase()
    }

    pub fn version(&self) -> Version {
        self.raw.version()
    }

    pub fn set_version(&mut self, version: Version) -> &mut Self {
        self.update(|raw| raw.with_version(version))
    }

    // ── Headers ───────────────────────────────────────────────────────────────

    /// Appends a header value.
    pub fn header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let (name, value) = header_pair(name, value)?;
        Ok(self.update(|raw| raw.with_added_header(name, value)))
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.update(|raw| raw.without_header(name))
    }

    pub fn headers(&self) -> IndexMap<String, Vec<String>> {
        self.raw
            .headers()
            .keys()
            .map(|name| (name.as_str().to_owned(), self.raw.header(name)))
            .collect()
    }

    pub fn get_header(&self, name: &str) -> Vec<String> {
        self.raw.header(name)
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.raw.has_header(name)
    }

    // ── Body ──────────────────────────────────────────────────────────────────

    /// Sets the body.
    ///
    /// A [`Body`] is adopted as-is. Strings, bytes and readers are turned into
    /// a stream by the attached factory.
    pub fn body(&mut self, content: impl Into<Content>) -> Result<&mut Self> {
        let body = self.materialize(content.into())?;
        Ok(self.update(|raw| raw.with_body(body)))
    }

    pub fn get_body(&self) -> &Body {
        self.raw.body()
    }

    /// Appends `text` to the current body contents.
    pub fn write(&mut self, text: &str) -> Result<&mut Self> {
        let mut buf = self.raw.body().to_bytes()?.to_vec();
        buf.extend_from_slice(text.as_bytes());
        Ok(self.update(|raw| raw.with_body(Body::from(buf))))
    }

    fn materialize(&self, content: Content) -> Result<Body> {
        match (content, &self.factory) {
            (Content::Stream(body), _) => Ok(body),
            (content, Some(factory)) => factory.stream(content),
            (_, None) => Err(Error::Precondition(
                "No factory instance set in response object".into(),
            )),
        }
    }

    // ── Shortcuts ─────────────────────────────────────────────────────────────

    /// Redirects to `url` with `code`, usually `302 Found` or
    /// `301 Moved Permanently`.
    pub fn redirect(&mut self, url: &str, code: StatusCode) -> Result<&mut Self> {
        let location = HeaderValue::from_str(url)?;
        Ok(self.update(|raw| raw.with_header(LOCATION, location).with_status(code, None)))
    }

    /// Sets status and `Content-Type`, and the body when one is given.
    ///
    /// A ready-made [`Body`] is adopted without a factory. Any other content
    /// needs one, as with [`body`](Self::body).
    pub fn with_content_type(
        &mut self,
        content_type: &str,
        body: Option<Content>,
        code: StatusCode,
        reason: Option<&str>,
    ) -> Result<&mut Self> {
        let content_type = HeaderValue::from_str(content_type)?;
        let body = body.map(|content| self.materialize(content)).transpose()?;

        Ok(self.update(|raw| {
            let raw = raw
                .with_status(code, reason)
                .with_header(CONTENT_TYPE, content_type);
            match body {
                Some(body) => raw.with_body(body),
                None => raw,
            }
        }))
    }

    /// A `text/html` response.
    pub fn html(
        &mut self,
        body: impl Into<Content>,
        code: StatusCode,
        reason: Option<&str>,
    ) -> Result<&mut Self> {
        self.with_content_type(mime::TEXT_HTML.as_ref(), Some(body.into()), code, reason)
    }

    /// A `text/plain` response.
    pub fn text(
        &mut self,
        body: impl Into<Content>,
        code: StatusCode,
        reason: Option<&str>,
    ) -> Result<&mut Self> {
        self.with_content_type(mime::TEXT_PLAIN.as_ref(), Some(body.into()), code, reason)
    }

    /// An `application/json` response. Slashes are not escaped.
    pub fn json<T: Serialize + ?Sized>(
        &mut self,
        data: &T,
        code: StatusCode,
        reason: Option<&str>,
    ) -> Result<&mut Self> {
        let encoded = serde_json::to_string(data).map_err(Error::Json)?;
        self.with_content_type(mime::APPLICATION_JSON.as_ref(), Some(encoded.into()), code, reason)
    }

    /// Like [`json`](Self::json), for lazy sequences. The items are collected
    /// into a list before encoding.
    pub fn json_iter<I>(&mut self, items: I, code: StatusCode, reason: Option<&str>) -> Result<&mut Self>
    where
        I: IntoIterator,
        I::Item: Serialize,
    {
        let items: Vec<I::Item> = items.into_iter().collect();
        self.json(&items, code, reason)
    }

    // ── Files ─────────────────────────────────────────────────────────────────

    /// Streams the file at `path`.
    ///
    /// `Content-Type` and `Content-Transfer-Encoding` come from the file's
    /// contents, `Content-Length` from the stream size when it is known.
    pub fn file(&mut self, path: impl AsRef<Path>, code: StatusCode, reason: Option<&str>) -> Result<&mut Self> {
        let path = path.as_ref();
        validate_file(path)?;

        let factory = self.factory.as_ref().ok_or_else(|| {
            Error::Precondition("No factory instance set in response object".into())
        })?;

        let sniffed = sniff_file(path)?;
        let stream = factory.stream_from_file(path, "rb")?;
        let size = stream.size();

        debug!(path = %path.display(), mime = sniffed.mime, size, "file response");

        Ok(self.update(|raw| {
            let raw = raw
                .with_status(code, reason)
                .with_header(CONTENT_TYPE, HeaderValue::from_static(sniffed.mime))
                .with_header(CONTENT_TRANSFER_ENCODING, HeaderValue::from_static(sniffed.encoding))
                .with_body(stream);
            match size {
                Some(size) => raw.with_header(CONTENT_LENGTH, HeaderValue::from(size)),
                None => raw,
            }
        }))
    }

    /// Like [`file`](Self::file), but asks the client to save the file as
    /// `new_name`, or under its own name when none is given.
    pub fn download(
        &mut self,
        path: impl AsRef<Path>,
        new_name: Option<&str>,
        code: StatusCode,
        reason: Option<&str>,
    ) -> Result<&mut Self> {
        let path = path.as_ref();
        self.file(path, code, reason)?;

        let name = match new_name.filter(|n| !n.is_empty()) {
            Some(name) => name.to_owned(),
            None => basename(path),
        };
        let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{name}\""))?;

        Ok(self.update(|raw| raw.with_added_header(CONTENT_DISPOSITION, disposition)))
    }

    /// Hands the transfer of `path` to the front-end server.
    ///
    /// nginx gets `X-Accel-Redirect`, everything else `X-Sendfile`. The body
    /// is left alone.
    pub fn sendfile(&mut self, path: impl AsRef<Path>, code: StatusCode, reason: Option<&str>) -> Result<&mut Self> {
        let path = path.as_ref();
        validate_file(path)?;

        let env = std::env::var("SERVER_SOFTWARE").ok();
        let header = offload_header(self.server_software.as_deref(), env.as_deref());
        let value = HeaderValue::from_str(&path.to_string_lossy())?;

        debug!(path = %path.display(), header = header.as_str(), "sendfile offload");

        Ok(self.update(|raw| raw.with_status(code, reason).with_header(header, value)))
    }

    /// Converts the wrapped snapshot into an `http` response.
    pub fn into_http(self) -> Result<http::Response<http_body_util::Full<bytes::Bytes>>> {
        self.raw.into_http()
    }
}

impl From<RawResponse> for Response {
    fn from(raw: RawResponse) -> Self {
        Self::new(raw)
    }
}

fn validate_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::FileNotFound(path.to_owned()))
    }
}

/// `X-Accel-Redirect` when the server software mentions nginx in any case,
/// `X-Sendfile` otherwise. An explicit override wins over `env`.
fn offload_header(configured: Option<&str>, env: Option<&str>) -> HeaderName {
    let software = configured.or(env).unwrap_or_default();
    if software.to_ascii_lowercase().contains("nginx") {
        X_ACCEL_REDIRECT
    } else {
        X_SENDFILE
    }
}

fn basename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
