//! The request view.
//!
//! [`Request`] wraps one immutable [`ServerRequest`] at a time and gives it
//! fail-fast accessors. Mutators swap the wrapped snapshot for a new one
//! built by the corresponding with-er; the view changes, the snapshot never
//! does.
//!
//! Lookups come in pairs. The plain form fails with [`Error::NotFound`] when
//! the key is missing; the `_or` form returns the default you hand it, even
//! when that default is `null`:
//!
//! ```rust
//! use serde_json::Value;
//! use veneer::{Request, ServerRequest};
//!
//! let req = Request::new(ServerRequest::default());
//!
//! assert!(req.param("page").is_err());
//! assert_eq!(req.param_or("page", "1"), "1");
//! assert_eq!(req.param_or("page", Value::Null), Value::Null);
//! ```

use http::header::ACCEPT;
use http::{Method, Uri, Version};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::body::Body;
use crate::error::{Error, Result};
use crate::message::{FileTree, Params, ServerRequest, UploadedFile, UploadedNode, header_pair};

// ── Key ───────────────────────────────────────────────────────────────────────

/// One argument of an uploaded-file key path.
///
/// Pass either plain names or exactly one path, never both:
///
/// ```rust
/// use veneer::Key;
///
/// let by_name = [Key::from("nested"), Key::from("avatar")];
/// let by_path = [Key::from(&["nested", "avatar"])];
/// # let _ = (by_name, by_path);
/// ```
#[derive(Clone, Copy, Debug)]
pub enum Key<'a> {
    Name(&'a str),
    Path(&'a [&'a str]),
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl<'a> From<&'a [&'a str]> for Key<'a> {
    fn from(path: &'a [&'a str]) -> Self {
        Self::Path(path)
    }
}

impl<'a, const N: usize> From<&'a [&'a str; N]> for Key<'a> {
    fn from(path: &'a [&'a str; N]) -> Self {
        Self::Path(path.as_slice())
    }
}

impl<'a> From<&'a Vec<&'a str>> for Key<'a> {
    fn from(path: &'a Vec<&'a str>) -> Self {
        Self::Path(path.as_slice())
    }
}

/// Flattens key arguments into a single path.
fn key_path<'a>(keys: &[Key<'a>]) -> Result<Vec<&'a str>> {
    let mixed = || Error::InvalidArgument("Either provide a single array or plain string arguments".into());

    match keys {
        [Key::Path(path)] => Ok(path.to_vec()),
        _ => keys
            .iter()
            .map(|key| match key {
                Key::Name(name) => Ok(*name),
                Key::Path(_) => Err(mixed()),
            })
            .collect(),
    }
}

/// Renders a key path as `['a']['b']`.
fn format_keys(path: &[&str]) -> String {
    path.iter().map(|key| format!("['{key}']")).collect()
}

// ── Request ───────────────────────────────────────────────────────────────────

/// A mutable façade over an immutable [`ServerRequest`].
///
/// A view is meant to live inside one request-handling call stack. It is not
/// synchronised; share the underlying snapshot instead of the view.
#[derive(Clone, Debug)]
pub struct Request {
    raw: ServerRequest,
}

impl Request {
    pub fn new(raw: ServerRequest) -> Self {
        Self { raw }
    }

    /// The wrapped snapshot.
    pub fn raw(&self) -> &ServerRequest {
        &self.raw
    }

    pub fn into_raw(self) -> ServerRequest {
        self.raw
    }

    /// Replaces the wrapped snapshot.
    pub fn wrap(&mut self, raw: ServerRequest) -> &mut Self {
        self.raw = raw;
        self
    }

    fn update(&mut self, f: impl FnOnce(ServerRequest) -> ServerRequest) -> &mut Self {
        let raw = std::mem::take(&mut self.raw);
        self.raw = f(raw);
        self
    }

    // ── Flat maps ─────────────────────────────────────────────────────────────

    pub fn params(&self) -> &Params {
        self.raw.query_params()
    }

    /// Query string variable `key`.
    pub fn param(&self, key: &str) -> Result<Value> {
        require(Some(self.raw.query_params()), key, "Query string variable not found")
    }

    pub fn param_or(&self, key: &str, default: impl Into<Value>) -> Value {
        or_default(Some(self.raw.query_params()), key, default)
    }

    /// The parsed body, `None` when the host did not parse one.
    pub fn form(&self) -> Option<&Params> {
        self.raw.parsed_body()
    }

    /// Form field `key`. A request without a parsed body has no fields.
    pub fn field(&self, key: &str) -> Result<Value> {
        require(self.raw.parsed_body(), key, "Form field not found")
    }

    pub fn field_or(&self, key: &str, default: impl Into<Value>) -> Value {
        or_default(self.raw.parsed_body(), key, default)
    }

    pub fn cookies(&self) -> &Params {
        self.raw.cookie_params()
    }

    pub fn cookie(&self, key: &str) -> Result<Value> {
        require(Some(self.raw.cookie_params()), key, "Cookie not found")
    }

    pub fn cookie_or(&self, key: &str, default: impl Into<Value>) -> Value {
        or_default(Some(self.raw.cookie_params()), key, default)
    }

    pub fn server_params(&self) -> &Params {
        self.raw.server_params()
    }

    pub fn server(&self, key: &str) -> Result<Value> {
        require(Some(self.raw.server_params()), key, "Server parameter not found")
    }

    pub fn server_or(&self, key: &str, default: impl Into<Value>) -> Value {
        or_default(Some(self.raw.server_params()), key, default)
    }

    pub fn attributes(&self) -> &Params {
        self.raw.attributes()
    }

    /// Request attribute `key`, as set by [`set`](Self::set) or the host.
    pub fn get(&self, key: &str) -> Result<Value> {
        require(Some(self.raw.attributes()), key, "Request attribute not found")
    }

    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        or_default(Some(self.raw.attributes()), key, default)
    }

    pub fn set(&mut self, attribute: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.update(|raw| raw.with_attribute(attribute, value))
    }

    pub fn unset(&mut self, attribute: &str) -> &mut Self {
        self.update(|raw| raw.without_attribute(attribute))
    }

    // ── Headers ───────────────────────────────────────────────────────────────

    /// Every value of header `name` joined with `", "`; empty when absent.
    pub fn header(&self, name: &str) -> String {
        self.raw.header_line(name)
    }

    /// All headers, each name mapped to its values.
    pub fn headers(&self) -> IndexMap<String, Vec<String>> {
        self.raw
            .headers()
            .keys()
            .map(|name| (name.as_str().to_owned(), self.raw.header(name)))
            .collect()
    }

    /// All headers, each name mapped to its first value only.
    pub fn first_headers(&self) -> IndexMap<String, String> {
        self.raw
            .headers()
            .keys()
            .map(|name| {
                let first = self.raw.header(name).into_iter().next().unwrap_or_default();
                (name.as_str().to_owned(), first)
            })
            .collect()
    }

    /// The media ranges of the `Accept` header.
    pub fn accept(&self) -> Vec<String> {
        self.raw
            .header_line(ACCEPT)
            .split(',')
            .map(str::trim)
            .filter(|range| !range.is_empty())
            .map(str::to_owned)
            .collect()
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let (name, value) = header_pair(name, value)?;
        Ok(self.update(|raw| raw.with_header(name, value)))
    }

    pub fn add_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let (name, value) = header_pair(name, value)?;
        Ok(self.update(|raw| raw.with_added_header(name, value)))
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        self.update(|raw| raw.without_header(name))
    }

    // ── Request line ──────────────────────────────────────────────────────────

    pub fn uri(&self) -> &Uri {
        self.raw.uri()
    }

    /// `scheme://authority` of the request URI. Missing parts are left out.
    pub fn origin(&self) -> String {
        let uri = self.raw.uri();
        let mut origin = String::new();

        if let Some(scheme) = uri.scheme_str() {
            origin.push_str(scheme);
            origin.push(':');
        }
        if let Some(authority) = uri.authority() {
            origin.push_str("//");
            origin.push_str(authority.as_str());
        }

        origin
    }

    /// The method, upper-cased.
    pub fn method(&self) -> String {
        self.raw.method().as_str().to_ascii_uppercase()
    }

    pub fn is_method(&self, method: &str) -> bool {
        self.raw.method().as_str().eq_ignore_ascii_case(method)
    }

    pub fn version(&self) -> Version {
        self.raw.version()
    }

    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.update(|raw| raw.with_method(method))
    }

    pub fn set_uri(&mut self, uri: Uri) -> &mut Self {
        self.update(|raw| raw.with_uri(uri))
    }

    pub fn set_version(&mut self, version: Version) -> &mut Self {
        self.update(|raw| raw.with_version(version))
    }

    pub fn set_query_params(&mut self, params: Params) -> &mut Self {
        self.update(|raw| raw.with_query_params(params))
    }

    pub fn set_form(&mut self, form: Option<Params>) -> &mut Self {
        self.update(|raw| raw.with_parsed_body(form))
    }

    pub fn set_cookies(&mut self, cookies: Params) -> &mut Self {
        self.update(|raw| raw.with_cookie_params(cookies))
    }

    // ── Body ──────────────────────────────────────────────────────────────────

    pub fn body(&self) -> &Body {
        self.raw.body()
    }

    pub fn set_body(&mut self, body: Body) -> &mut Self {
        self.update(|raw| raw.with_body(body))
    }

    /// Decodes the body as JSON. Objects come back as plain maps.
    ///
    /// An empty body yields `None`; anything else that is not valid JSON is
    /// [`Error::Malformed`].
    pub fn json(&self) -> Result<Option<Value>> {
        self.json_as()
    }

    /// Decodes the body as JSON into `T`, with the same empty-body rule as
    /// [`json`](Self::json).
    pub fn json_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let bytes = self.raw.body().to_bytes()?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes).map(Some).map_err(Error::Malformed)
    }

    // ── Uploaded files ────────────────────────────────────────────────────────

    pub fn set_uploaded_files(&mut self, files: FileTree) -> &mut Self {
        self.update(|raw| raw.with_uploaded_files(files))
    }

    /// The files found at a key path.
    ///
    /// Without keys this is the whole uploaded-file tree. A single file at
    /// the end of the path comes back as a one-entry list keyed `"0"`, so one
    /// upload and many uploads have the same shape.
    pub fn files(&self, keys: &[Key<'_>]) -> Result<FileTree> {
        let path = key_path(keys)?;
        let mut tree = self.raw.uploaded_files();

        let Some((last, parents)) = path.split_last() else {
            return Ok(tree.clone());
        };

        let invalid = || {
            debug!(keys = %format_keys(&path), "uploaded files lookup failed");
            Error::OutOfBounds(format!("Invalid files key {}", format_keys(&path)))
        };

        for key in parents {
            tree = match tree.get(*key) {
                Some(UploadedNode::Tree(sub)) => sub,
                _ => return Err(invalid()),
            };
        }

        match tree.get(*last) {
            Some(UploadedNode::File(file)) => {
                Ok(FileTree::from([("0".to_owned(), UploadedNode::File(file.clone()))]))
            }
            Some(UploadedNode::Tree(sub)) => Ok(sub.clone()),
            None => Err(invalid()),
        }
    }

    /// The single file at a key path.
    ///
    /// Fails with [`Error::Required`] without keys, [`Error::OutOfBounds`]
    /// when the path does not resolve or runs past a file, and
    /// [`Error::Conflict`] when it ends on more than one file.
    pub fn file(&self, keys: &[Key<'_>]) -> Result<UploadedFile> {
        let path = key_path(keys)?;
        if path.is_empty() {
            return Err(Error::Required("No file key given".into()));
        }

        let mut tree = self.raw.uploaded_files();
        for (i, key) in path.iter().enumerate() {
            match tree.get(*key) {
                Some(UploadedNode::File(file)) if i + 1 == path.len() => return Ok(file.clone()),
                Some(UploadedNode::File(_)) => {
                    return Err(Error::OutOfBounds(format!(
                        "Invalid file key (too deep) {}",
                        format_keys(&path)
                    )));
                }
                Some(UploadedNode::Tree(sub)) => tree = sub,
                None => {
                    debug!(keys = %format_keys(&path), "uploaded file lookup failed");
                    return Err(Error::OutOfBounds(format!(
                        "Invalid file key {}",
                        format_keys(&path)
                    )));
                }
            }
        }

        Err(Error::Conflict(format!(
            "Multiple files available at key {}",
            format_keys(&path)
        )))
    }
}

impl From<ServerRequest> for Request {
    fn from(raw: ServerRequest) -> Self {
        Self::new(raw)
    }
}

// ── Lookup helpers ────────────────────────────────────────────────────────────

fn require(map: Option<&Params>, key: &str, label: &str) -> Result<Value> {
    map.and_then(|m| m.get(key))
        .cloned()
        .ok_or_else(|| Error::NotFound(format!("{label}: '{key}'")))
}

fn or_default(map: Option<&Params>, key: &str, default: impl Into<Value>) -> Value {
    match map.and_then(|m| m.get(key)) {
        Some(value) => value.clone(),
        None => {
            debug!(key, "lookup fell back to default");
            default.into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_path_accepts_names_or_one_path() {
        let names = key_path(&["a".into(), "b".into()]).unwrap();
        assert_eq!(names, ["a", "b"]);

        let path = key_path(&[(&["a", "b"]).into()]).unwrap();
        assert_eq!(path, ["a", "b"]);

        assert!(key_path(&[]).unwrap().is_empty());
    }

    #[test]
    fn key_path_rejects_two_paths_or_mixing() {
        let empty: &[&str] = &[];
        for keys in [
            vec![Key::Path(empty), Key::Path(empty)],
            vec![Key::Path(&["a"]), Key::Name("b")],
            vec![Key::Name("a"), Key::Path(&["b"])],
        ] {
            let err = key_path(&keys).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
            assert!(err.to_string().starts_with("Either provide"));
        }
    }

    #[test]
    fn format_keys_brackets_each_key() {
        assert_eq!(format_keys(&["a", "b", "c"]), "['a']['b']['c']");
    }

    #[test]
    fn present_null_is_not_missing() {
        let params = Params::from([("empty".to_owned(), Value::Null)]);
        assert_eq!(require(Some(&params), "empty", "x").unwrap(), Value::Null);
        assert_eq!(or_default(Some(&params), "empty", "fallback"), Value::Null);
    }

    #[test]
    fn absent_map_behaves_like_missing_key() {
        let err = require(None, "k", "Form field not found").unwrap_err();
        assert_eq!(err.to_string(), "Form field not found: 'k'");
        assert_eq!(or_default(None, "k", 7), 7);
    }
}
