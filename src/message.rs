//! Raw, immutable HTTP messages.
//!
//! [`ServerRequest`] and [`RawResponse`] are the values the views wrap. They
//! are built from `http` crate parts and never change once constructed: every
//! `with_*` method consumes the value and hands back a new one. The state sits
//! behind an [`Arc`], so a with-er only copies it when another snapshot still
//! shares it. Anyone holding an older snapshot keeps seeing the old message.
//!
//! ```rust
//! use veneer::ServerRequest;
//!
//! let before = ServerRequest::default();
//! let after = before.clone().with_attribute("user", "chuck");
//!
//! assert!(before.attributes().is_empty());
//! assert_eq!(after.attributes()["user"], "chuck");
//! ```

use std::sync::Arc;

use bytes::Bytes;
use http::header::{AsHeaderName, CONTENT_LENGTH, COOKIE, HeaderName, HeaderValue};
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use http_body_util::Full;
use indexmap::IndexMap;
use serde_json::Value;

use crate::body::Body;
use crate::error::{Error, Result};

/// An ordered string-keyed map of loosely typed values.
///
/// Query parameters, form fields, cookies, server parameters and request
/// attributes all use this shape.
pub type Params = IndexMap<String, Value>;

/// A nested mapping of uploaded files.
pub type FileTree = IndexMap<String, UploadedNode>;

// ── Uploaded files ────────────────────────────────────────────────────────────

/// A single uploaded file as handed over by the multipart decoder.
#[derive(Clone, Debug, Default)]
pub struct UploadedFile {
    stream: Body,
    client_filename: Option<String>,
    client_media_type: Option<String>,
    error: u16,
}

impl UploadedFile {
    pub fn new(stream: Body) -> Self {
        Self { stream, ..Self::default() }
    }

    pub fn with_client_filename(mut self, name: impl Into<String>) -> Self {
        self.client_filename = Some(name.into());
        self
    }

    pub fn with_client_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.client_media_type = Some(media_type.into());
        self
    }

    /// Sets the decoder's upload error code. `0` means success.
    pub fn with_error(mut self, code: u16) -> Self {
        self.error = code;
        self
    }

    pub fn stream(&self) -> &Body { &self.stream }
    pub fn size(&self) -> Option<u64> { self.stream.size() }
    pub fn client_filename(&self) -> Option<&str> { self.client_filename.as_deref() }
    pub fn client_media_type(&self) -> Option<&str> { self.client_media_type.as_deref() }
    pub fn error(&self) -> u16 { self.error }
}

/// One entry of a [`FileTree`]: a file, or another level of nesting.
///
/// Multi-file uploads (`name="docs[]"`) are trees keyed `"0"`, `"1"`, …
#[derive(Clone, Debug)]
pub enum UploadedNode {
    File(UploadedFile),
    Tree(FileTree),
}

impl UploadedNode {
    /// Builds a list node keyed by position.
    pub fn list(files: impl IntoIterator<Item = UploadedFile>) -> Self {
        Self::Tree(
            files
                .into_iter()
                .enumerate()
                .map(|(i, file)| (i.to_string(), Self::File(file)))
                .collect(),
        )
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Tree(_) => None,
        }
    }

    pub fn as_tree(&self) -> Option<&FileTree> {
        match self {
            Self::File(_) => None,
            Self::Tree(tree) => Some(tree),
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl From<UploadedFile> for UploadedNode {
    fn from(file: UploadedFile) -> Self {
        Self::File(file)
    }
}

impl From<FileTree> for UploadedNode {
    fn from(tree: FileTree) -> Self {
        Self::Tree(tree)
    }
}

// ── ServerRequest ─────────────────────────────────────────────────────────────

/// An immutable inbound request together with everything the host parsed
/// out of it.
#[derive(Clone, Debug, Default)]
pub struct ServerRequest(Arc<RequestParts>);

#[derive(Clone, Debug, Default)]
struct RequestParts {
    method: Method,
    uri: Uri,
    version: Version,
    headers: HeaderMap,
    body: Body,
    query: Params,
    parsed_body: Option<Params>,
    cookies: Params,
    server: Params,
    attributes: Params,
    files: FileTree,
}

impl ServerRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self(Arc::new(RequestParts { method, uri, ..RequestParts::default() }))
    }

    /// Adopts an `http` request.
    ///
    /// Query parameters come from the URI's query string, cookies from the
    /// `Cookie` headers, and a CGI-style set of server parameters
    /// (`REQUEST_METHOD`, `REQUEST_URI`, `QUERY_STRING`, `SERVER_PROTOCOL`,
    /// `HTTP_*`) is derived from the request line and headers. The body is
    /// kept as-is; no form or multipart decoding happens here.
    pub fn from_http(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();

        let query: Params = parts
            .uri
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
                    .collect()
            })
            .unwrap_or_default();

        let cookies: Params = parts
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_owned(), Value::String(v.trim().to_owned())))
            .collect();

        let mut server = Params::new();
        server.insert("REQUEST_METHOD".into(), parts.method.as_str().into());
        server.insert("REQUEST_URI".into(), request_target(&parts.uri).into());
        server.insert("QUERY_STRING".into(), parts.uri.query().unwrap_or("").into());
        server.insert("SERVER_PROTOCOL".into(), format!("{:?}", parts.version).into());
        for name in parts.headers.keys() {
            let key = format!("HTTP_{}", name.as_str().to_ascii_uppercase().replace('-', "_"));
            server.insert(key, header_line(&parts.headers, name).into());
        }

        Self(Arc::new(RequestParts {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: parts.headers,
            body: Body::from(body),
            query,
            parsed_body: None,
            cookies,
            server,
            attributes: Params::new(),
            files: FileTree::new(),
        }))
    }

    /// Whether `a` and `b` are the very same snapshot.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn method(&self) -> &Method { &self.0.method }
    pub fn uri(&self) -> &Uri { &self.0.uri }
    pub fn version(&self) -> Version { self.0.version }
    pub fn headers(&self) -> &HeaderMap { &self.0.headers }
    pub fn body(&self) -> &Body { &self.0.body }
    pub fn query_params(&self) -> &Params { &self.0.query }
    pub fn parsed_body(&self) -> Option<&Params> { self.0.parsed_body.as_ref() }
    pub fn cookie_params(&self) -> &Params { &self.0.cookies }
    pub fn server_params(&self) -> &Params { &self.0.server }
    pub fn attributes(&self) -> &Params { &self.0.attributes }
    pub fn uploaded_files(&self) -> &FileTree { &self.0.files }

    /// Path and query, `/` when the URI has neither.
    pub fn request_target(&self) -> String {
        request_target(&self.0.uri)
    }

    /// All values of header `name`, in insertion order.
    pub fn header(&self, name: impl AsHeaderName) -> Vec<String> {
        header_values(&self.0.headers, name)
    }

    /// All values of header `name` joined with `", "`; empty when absent.
    pub fn header_line(&self, name: impl AsHeaderName) -> String {
        header_line(&self.0.headers, name)
    }

    pub fn has_header(&self, name: impl AsHeaderName) -> bool {
        self.0.headers.contains_key(name)
    }

    pub fn with_method(mut self, method: Method) -> Self {
        Arc::make_mut(&mut self.0).method = method;
        self
    }

    pub fn with_uri(mut self, uri: Uri) -> Self {
        Arc::make_mut(&mut self.0).uri = uri;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        Arc::make_mut(&mut self.0).version = version;
        self
    }

    /// Replaces every value of `name` with `value`.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.0).headers.insert(name, value);
        self
    }

    /// Appends `value` to the values of `name`.
    pub fn with_added_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.0).headers.append(name, value);
        self
    }

    pub fn without_header(mut self, name: impl AsHeaderName) -> Self {
        Arc::make_mut(&mut self.0).headers.remove(name);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        Arc::make_mut(&mut self.0).body = body;
        self
    }

    pub fn with_query_params(mut self, query: Params) -> Self {
        Arc::make_mut(&mut self.0).query = query;
        self
    }

    pub fn with_parsed_body(mut self, data: Option<Params>) -> Self {
        Arc::make_mut(&mut self.0).parsed_body = data;
        self
    }

    pub fn with_cookie_params(mut self, cookies: Params) -> Self {
        Arc::make_mut(&mut self.0).cookies = cookies;
        self
    }

    pub fn with_server_params(mut self, server: Params) -> Self {
        Arc::make_mut(&mut self.0).server = server;
        self
    }

    pub fn with_uploaded_files(mut self, files: FileTree) -> Self {
        Arc::make_mut(&mut self.0).files = files;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        Arc::make_mut(&mut self.0).attributes.insert(name.into(), value.into());
        self
    }

    pub fn without_attribute(mut self, name: &str) -> Self {
        Arc::make_mut(&mut self.0).attributes.shift_remove(name);
        self
    }
}

// ── RawResponse ───────────────────────────────────────────────────────────────

/// An immutable outbound response.
#[derive(Clone, Debug, Default)]
pub struct RawResponse(Arc<ResponseParts>);

#[derive(Clone, Debug, Default)]
struct ResponseParts {
    status: StatusCode,
    reason: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Body,
}

impl RawResponse {
    /// A response with `status`. An absent or empty `reason` falls back to the
    /// canonical phrase for the code.
    pub fn new(status: StatusCode, reason: Option<&str>) -> Self {
        Self(Arc::new(ResponseParts {
            status,
            reason: explicit_reason(reason),
            ..ResponseParts::default()
        }))
    }

    /// Adopts an `http` response.
    pub fn from_http(res: http::Response<Bytes>) -> Self {
        let (parts, body) = res.into_parts();
        Self(Arc::new(ResponseParts {
            status: parts.status,
            reason: None,
            version: parts.version,
            headers: parts.headers,
            body: Body::from(body),
        }))
    }

    /// Converts into an `http` response ready for a hyper-style host.
    ///
    /// File-backed bodies are read into memory and `Content-Length` is set
    /// when missing. The custom reason phrase has no place in
    /// `http::Response` and is dropped.
    pub fn into_http(self) -> Result<http::Response<Full<Bytes>>> {
        let bytes = self.0.body.to_bytes()?;
        let parts = Arc::try_unwrap(self.0).unwrap_or_else(|shared| (*shared).clone());

        let mut headers = parts.headers;
        headers.entry(CONTENT_LENGTH).or_insert_with(|| HeaderValue::from(bytes.len()));

        let mut res = http::Response::new(Full::new(bytes));
        *res.status_mut() = parts.status;
        *res.version_mut() = parts.version;
        *res.headers_mut() = headers;
        Ok(res)
    }

    /// Whether `a` and `b` are the very same snapshot.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    pub fn status(&self) -> StatusCode { self.0.status }
    pub fn version(&self) -> Version { self.0.version }
    pub fn headers(&self) -> &HeaderMap { &self.0.headers }
    pub fn body(&self) -> &Body { &self.0.body }

    /// The explicit reason phrase, else the canonical one, else `""`.
    pub fn reason_phrase(&self) -> &str {
        self.0
            .reason
            .as_deref()
            .or_else(|| self.0.status.canonical_reason())
            .unwrap_or("")
    }

    pub fn header(&self, name: impl AsHeaderName) -> Vec<String> {
        header_values(&self.0.headers, name)
    }

    pub fn header_line(&self, name: impl AsHeaderName) -> String {
        header_line(&self.0.headers, name)
    }

    pub fn has_header(&self, name: impl AsHeaderName) -> bool {
        self.0.headers.contains_key(name)
    }

    pub fn with_status(mut self, status: StatusCode, reason: Option<&str>) -> Self {
        let parts = Arc::make_mut(&mut self.0);
        parts.status = status;
        parts.reason = explicit_reason(reason);
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        Arc::make_mut(&mut self.0).version = version;
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.0).headers.insert(name, value);
        self
    }

    pub fn with_added_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        Arc::make_mut(&mut self.0).headers.append(name, value);
        self
    }

    pub fn without_header(mut self, name: impl AsHeaderName) -> Self {
        Arc::make_mut(&mut self.0).headers.remove(name);
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        Arc::make_mut(&mut self.0).body = body;
        self
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn explicit_reason(reason: Option<&str>) -> Option<String> {
    reason.filter(|r| !r.is_empty()).map(str::to_owned)
}

fn request_target(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .filter(|pq| !pq.is_empty())
        .unwrap_or("/")
        .to_owned()
}

fn header_values(headers: &HeaderMap, name: impl AsHeaderName) -> Vec<String> {
    headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect()
}

pub(crate) fn header_line(headers: &HeaderMap, name: impl AsHeaderName) -> String {
    header_values(headers, name).join(", ")
}

/// Parses a header name/value pair given as strings.
pub(crate) fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::from_bytes(name.as_bytes())?;
    let value = HeaderValue::from_str(value).map_err(Error::from)?;
    Ok((name, value))
}
