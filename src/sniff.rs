//! Content-based file type detection.
//!
//! File responses describe their body by looking at the bytes, not at the
//! file name. Only the first [`SAMPLE_LEN`] bytes are inspected.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::Result;

pub(crate) const SAMPLE_LEN: usize = 8192;

/// What the first bytes of a file say about it.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Sniffed {
    /// Media type essence, e.g. `image/png`.
    pub mime: &'static str,
    /// `binary`, `us-ascii` or `utf-8`.
    pub encoding: &'static str,
}

// Signatures anchored at offset 0.
const MAGIC: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"%PDF-", "application/pdf"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"BZh", "application/x-bzip2"),
    (b"\xfd7zXZ\x00", "application/x-xz"),
    (b"7z\xbc\xaf\x27\x1c", "application/x-7z-compressed"),
    (b"OggS", "audio/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"fLaC", "audio/flac"),
    (b"wOFF", "font/woff"),
    (b"wOF2", "font/woff2"),
    (b"\x00asm", "application/wasm"),
    (b"\x7fELF", "application/x-executable"),
    (b"BM", "image/bmp"),
];

pub fn sniff_file(path: &Path) -> Result<Sniffed> {
    let mut sample = Vec::with_capacity(SAMPLE_LEN);
    File::open(path)?.take(SAMPLE_LEN as u64).read_to_end(&mut sample)?;
    Ok(sniff(&sample))
}

pub fn sniff(sample: &[u8]) -> Sniffed {
    if sample.is_empty() {
        return Sniffed { mime: "application/x-empty", encoding: "binary" };
    }

    if let Some(mime) = binary_signature(sample) {
        return Sniffed { mime, encoding: "binary" };
    }

    match text_encoding(sample) {
        Some(encoding) => Sniffed { mime: text_type(sample), encoding },
        None => Sniffed { mime: "application/octet-stream", encoding: "binary" },
    }
}

fn binary_signature(sample: &[u8]) -> Option<&'static str> {
    if sample.len() >= 12 && &sample[..4] == b"RIFF" {
        match &sample[8..12] {
            b"WEBP" => return Some("image/webp"),
            b"WAVE" => return Some("audio/wav"),
            b"AVI " => return Some("video/x-msvideo"),
            _ => {}
        }
    }

    if sample.len() >= 12 && &sample[4..8] == b"ftyp" {
        return Some(match &sample[8..12] {
            b"avif" => "image/avif",
            b"heic" | b"heix" => "image/heic",
            b"qt  " => "video/quicktime",
            _ => "video/mp4",
        });
    }

    MAGIC
        .iter()
        .find(|(magic, _)| sample.starts_with(magic))
        .map(|(_, mime)| *mime)
}

/// `Some` when the sample reads as text. A multi-byte sequence cut off by
/// the end of the sample still counts as UTF-8.
fn text_encoding(sample: &[u8]) -> Option<&'static str> {
    let valid = match std::str::from_utf8(sample) {
        Ok(text) => text,
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&sample[..e.valid_up_to()]).ok()?,
        Err(_) => return None,
    };

    if valid.chars().any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t' | '\x0c' | '\x1b')) {
        return None;
    }

    Some(if valid.is_ascii() { "us-ascii" } else { "utf-8" })
}

fn text_type(sample: &[u8]) -> &'static str {
    let text = String::from_utf8_lossy(sample);
    let head = text.trim_start_matches('\u{feff}').trim_start();
    let lower = head
        .get(..head.len().min(256))
        .unwrap_or(head)
        .to_ascii_lowercase();

    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        "text/html"
    } else if lower.starts_with("<svg") || (lower.starts_with("<?xml") && lower.contains("<svg")) {
        "image/svg+xml"
    } else if lower.starts_with("<?xml") {
        "text/xml"
    } else if (head.starts_with('{') || head.starts_with('['))
        && serde_json::from_str::<serde::de::IgnoredAny>(head).is_ok()
    {
        "application/json"
    } else {
        "text/plain"
    }
}
