//! Message bodies.
//!
//! A [`Body`] is the readable stream carried by a raw message. It is either a
//! chunk of memory or a file on disk whose size was captured when it was
//! opened. Cloning a body is cheap: memory bodies share their [`Bytes`], file
//! bodies share a path.
//!
//! [`Content`] is the raw material a [`Factory`](crate::Factory) turns into a
//! body: text, bytes, a reader the caller owns, or a ready-made body.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};

// ── Body ─────────────────────────────────────────────────────────────────────

/// A readable message body.
#[derive(Clone, Default)]
pub struct Body(Repr);

#[derive(Clone)]
enum Repr {
    Memory(Bytes),
    File { path: Arc<PathBuf>, len: u64 },
}

impl Default for Repr {
    fn default() -> Self {
        Self::Memory(Bytes::new())
    }
}

impl Body {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Opens `path` with an fopen-style `mode` and captures its size.
    ///
    /// Only readable modes are accepted: `r`, `rb`, `r+`, or any of `w`, `a`,
    /// `x`, `c` combined with `+`. The `b` and `t` flags are ignored.
    pub fn from_file(path: impl AsRef<Path>, mode: &str) -> Result<Self> {
        let path = path.as_ref();
        let options = open_options(mode)?;
        let file = options.open(path)?;
        let len = file.metadata()?.len();

        Ok(Self(Repr::File { path: Arc::new(path.to_owned()), len }))
    }

    /// Total length in bytes, when known.
    pub fn size(&self) -> Option<u64> {
        match &self.0 {
            Repr::Memory(bytes) => Some(bytes.len() as u64),
            Repr::File { len, .. } => Some(*len),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == Some(0)
    }

    /// The on-disk path backing this body, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.0 {
            Repr::Memory(_) => None,
            Repr::File { path, .. } => Some(path.as_path()),
        }
    }

    /// Reads the complete body into memory.
    pub fn to_bytes(&self) -> Result<Bytes> {
        match &self.0 {
            Repr::Memory(bytes) => Ok(bytes.clone()),
            Repr::File { path, .. } => Ok(Bytes::from(std::fs::read(path.as_path())?)),
        }
    }

    /// Reads the complete body and decodes it as UTF-8, replacing invalid
    /// sequences.
    pub fn to_string_lossy(&self) -> Result<String> {
        let bytes = self.to_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Memory(bytes) => f.debug_tuple("Body::Memory").field(&bytes.len()).finish(),
            Repr::File { path, len } => f
                .debug_struct("Body::File")
                .field("path", path)
                .field("len", len)
                .finish(),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self(Repr::Memory(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Repr::Memory(Bytes::from(bytes)))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self(Repr::Memory(Bytes::from(text)))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self(Repr::Memory(Bytes::from_static(text.as_bytes())))
    }
}

fn open_options(mode: &str) -> Result<OpenOptions> {
    let invalid = || Error::InvalidArgument(format!("Invalid stream mode: '{mode}'"));

    let mut chars = mode.chars();
    let primary = chars.next().ok_or_else(invalid)?;
    let mut plus = false;
    for c in chars {
        match c {
            '+' => plus = true,
            'b' | 't' => {}
            _ => return Err(invalid()),
        }
    }

    let mut options = OpenOptions::new();
    match (primary, plus) {
        ('r', false) => options.read(true),
        ('r', true) => options.read(true).write(true),
        ('w', true) => options.read(true).write(true).create(true).truncate(true),
        ('a', true) => options.read(true).append(true).create(true),
        ('x', true) => options.read(true).write(true).create_new(true),
        ('c', true) => options.read(true).write(true).create(true),
        ('w' | 'a' | 'x' | 'c', false) => {
            return Err(Error::InvalidArgument(format!(
                "Stream mode '{mode}' is not readable"
            )));
        }
        _ => return Err(invalid()),
    };

    Ok(options)
}

// ── Content ──────────────────────────────────────────────────────────────────

/// Raw body material.
///
/// Anything that is not already a [`Body`] needs a
/// [`Factory`](crate::Factory) to become one.
pub enum Content {
    Stream(Body),
    Text(String),
    Bytes(Bytes),
    /// A resource the caller already owns; it is read to the end once.
    Reader(Box<dyn Read>),
}

impl Content {
    pub fn reader(r: impl Read + 'static) -> Self {
        Self::Reader(Box::new(r))
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(body) => f.debug_tuple("Stream").field(body).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Body> for Content {
    fn from(body: Body) -> Self {
        Self::Stream(body)
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Bytes> for Content {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Content {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn memory_body_reports_size() {
        let body = Body::from("chuck");
        assert_eq!(body.size(), Some(5));
        assert_eq!(body.to_string_lossy().unwrap(), "chuck");
        assert!(Body::empty().is_empty());
    }

    #[test]
    fn file_body_reads_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"on disk").unwrap();

        let body = Body::from_file(tmp.path(), "rb").unwrap();
        assert_eq!(body.size(), Some(7));
        assert_eq!(body.path(), Some(tmp.path()));
        assert_eq!(&body.to_bytes().unwrap()[..], b"on disk");
    }

    #[test]
    fn write_only_modes_are_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        for mode in ["w", "a", "wb"] {
            let err = Body::from_file(tmp.path(), mode).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "{mode}");
        }
        let err = Body::from_file(tmp.path(), "rq").unwrap_err();
        assert!(err.to_string().contains("Invalid stream mode"));
        let err = Body::from_file(tmp.path(), "").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Body::from_file("/definitely/not/here.bin", "r").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
