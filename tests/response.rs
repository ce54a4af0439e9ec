use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;

use http::{StatusCode, Version};
use tempfile::TempDir;
use veneer::{Body, Content, DefaultFactory, Error, RawResponse, Response};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn response() -> Response {
    Response::from_factory(Arc::new(DefaultFactory))
}

/// A minimal lossless WebP, written under a misleading name.
fn webp(dir: &TempDir) -> PathBuf {
    let mut bytes = b"RIFF".to_vec();
    bytes.extend_from_slice(&26u32.to_le_bytes());
    bytes.extend_from_slice(b"WEBPVP8L");
    bytes.extend_from_slice(&[0x0d, 0, 0, 0, 0x2f, 0, 0, 0, 0x10, 0x07, 0x10, 0x11, 0x11, 0x88, 0x88, 0xfe, 0x07, 0x00]);

    let path = dir.path().join("image.bin");
    std::fs::write(&path, bytes).unwrap();
    path
}

fn text_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "Chuck Schuldiner\n").unwrap();
    path
}

// ── Wrapping and status ───────────────────────────────────────────────────────

#[test]
fn wrap_and_unwrap() {
    let first = RawResponse::default();
    let mut res = Response::new(first.clone());
    assert!(RawResponse::ptr_eq(res.raw(), &first));

    let second = RawResponse::default();
    res.wrap(second.clone());
    assert!(RawResponse::ptr_eq(res.raw(), &second));
    assert!(!RawResponse::ptr_eq(&res.into_raw(), &first));
}

#[test]
fn default_status() {
    let res = Response::new(RawResponse::default());
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.reason_phrase(), "OK");
}

#[test]
fn status_with_and_without_reason() {
    let mut res = response();

    res.status(StatusCode::NOT_FOUND, None);
    assert_eq!(res.status_code(), 404);
    assert_eq!(res.reason_phrase(), "Not Found");

    res.status(StatusCode::NOT_FOUND, Some("Nothing to see"));
    assert_eq!(res.reason_phrase(), "Nothing to see");

    res.status(StatusCode::NOT_FOUND, Some(""));
    assert_eq!(res.reason_phrase(), "Not Found");
}

#[test]
fn protocol_version() {
    let mut res = response();
    assert_eq!(res.version(), Version::HTTP_11);
    res.set_version(Version::HTTP_2);
    assert_eq!(res.version(), Version::HTTP_2);
}

// ── Headers ───────────────────────────────────────────────────────────────────

#[test]
fn header_lifecycle() {
    let mut res = Response::new(RawResponse::default());
    res.header("header-value", "value").unwrap();

    assert!(res.has_header("Header-Value"));
    assert_eq!(res.get_header("Header-Value")[0], "value");

    res.header("header-value", "second").unwrap();
    assert_eq!(res.headers()["header-value"], ["value", "second"]);

    res.remove_header("header-value");
    assert!(!res.has_header("Header-Value"));
}

#[test]
fn redirects() {
    let mut res = response();
    res.redirect("/chuck", StatusCode::FOUND).unwrap();
    assert_eq!(res.status_code(), 302);
    assert_eq!(res.get_header("Location"), ["/chuck"]);

    res.redirect("/chuck", StatusCode::MOVED_PERMANENTLY).unwrap();
    assert_eq!(res.status_code(), 301);
    assert_eq!(res.get_header("Location"), ["/chuck"]);
}

// ── Bodies ────────────────────────────────────────────────────────────────────

#[test]
fn string_body_with_factory() {
    let mut res = response();
    res.body("Chuck text").unwrap();
    assert_eq!(res.get_body().to_string_lossy().unwrap(), "Chuck text");
}

#[test]
fn string_body_without_factory() {
    let mut res = Response::new(RawResponse::default());
    let err = res.body("fails").unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));
    assert_eq!(err.to_string(), "No factory instance set in response object");
}

#[test]
fn attaching_a_factory_later() {
    let mut res = Response::new(RawResponse::default());
    assert!(res.factory().is_none());

    res.set_factory(Arc::new(DefaultFactory));
    res.body("late").unwrap();
    assert_eq!(res.get_body().to_string_lossy().unwrap(), "late");
}

#[test]
fn write_appends_to_body() {
    let mut res = response();
    res.write("text").unwrap();
    assert_eq!(res.get_body().to_string_lossy().unwrap(), "text");
}

#[test]
fn html_from_string() {
    let mut res = response();
    res.html("<h1>Chuck string</h1>", StatusCode::OK, None).unwrap();

    assert_eq!(res.get_body().to_string_lossy().unwrap(), "<h1>Chuck string</h1>");
    assert_eq!(res.get_header("Content-Type")[0], "text/html");
}

#[test]
fn html_from_reader() {
    let mut res = response();
    res.html(Content::reader(Cursor::new("<h1>Chuck resource</h1>")), StatusCode::OK, None)
        .unwrap();

    assert_eq!(res.get_body().to_string_lossy().unwrap(), "<h1>Chuck resource</h1>");
    assert_eq!(res.get_header("Content-Type")[0], "text/html");
}

#[test]
fn html_without_factory() {
    let mut res = Response::new(RawResponse::default());
    let err = res.html("<p/>", StatusCode::OK, None).unwrap_err();
    assert!(matches!(err, Error::Precondition(_)));
}

#[test]
fn text_with_status() {
    let mut res = response();
    res.text("gone", StatusCode::GONE, Some("Long gone")).unwrap();

    assert_eq!(res.get_body().to_string_lossy().unwrap(), "gone");
    assert_eq!(res.get_header("Content-Type")[0], "text/plain");
    assert_eq!(res.status_code(), StatusCode::GONE);
    assert_eq!(res.reason_phrase(), "Long gone");
}

#[test]
fn json_array() {
    let mut res = response();
    res.json(&[1, 2, 3], StatusCode::OK, None).unwrap();

    assert_eq!(res.get_body().to_string_lossy().unwrap(), "[1,2,3]");
    assert_eq!(res.get_header("Content-Type")[0], "application/json");
}

#[test]
fn json_from_lazy_iterator() {
    let mut res = response();
    res.json_iter((0..3).map(|i| [13, 31, 73][i]), StatusCode::OK, None).unwrap();

    assert_eq!(res.get_body().to_string_lossy().unwrap(), "[13,31,73]");
    assert_eq!(res.get_header("Content-Type")[0], "application/json");
}

// ── Files ─────────────────────────────────────────────────────────────────────

#[test]
fn file_type_comes_from_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = webp(&dir);

    let mut res = response();
    res.file(&path, StatusCode::OK, None).unwrap();

    let size = std::fs::metadata(&path).unwrap().len().to_string();
    assert_eq!(res.get_header("Content-Type"), ["image/webp"]);
    assert_eq!(res.get_header("Content-Transfer-Encoding"), ["binary"]);
    assert_eq!(res.get_header("Content-Length"), [size]);
    assert_eq!(res.get_body().path(), Some(path.as_path()));
}

#[test]
fn text_file_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = text_file(&dir);

    let mut res = response();
    res.file(&path, StatusCode::OK, None).unwrap();

    assert_eq!(res.get_header("Content-Type"), ["text/plain"]);
    assert_eq!(res.get_header("Content-Transfer-Encoding"), ["us-ascii"]);
    assert_eq!(res.get_body().to_string_lossy().unwrap(), "Chuck Schuldiner\n");
}

#[test]
fn file_without_factory() {
    let dir = tempfile::tempdir().unwrap();
    let path = text_file(&dir);

    let mut res = Response::new(RawResponse::default());
    assert!(matches!(res.file(&path, StatusCode::OK, None), Err(Error::Precondition(_))));
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("public/static/pixel.jpg");

    let err = response().file(&path, StatusCode::OK, None).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
    assert!(err.to_string().starts_with("File not found"));

    let err = response().file(dir.path(), StatusCode::OK, None).unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

#[test]
fn download_uses_basename() {
    let dir = tempfile::tempdir().unwrap();
    let path = webp(&dir);

    let mut res = response();
    res.download(&path, None, StatusCode::OK, None).unwrap();

    assert_eq!(res.get_header("Content-Type"), ["image/webp"]);
    assert_eq!(res.get_header("Content-Disposition"), [r#"attachment; filename="image.bin""#]);
}

#[test]
fn download_with_new_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = webp(&dir);

    let mut res = response();
    res.download(&path, Some("newname.webp"), StatusCode::OK, None).unwrap();

    assert_eq!(res.get_header("Content-Disposition"), [r#"attachment; filename="newname.webp""#]);
}

#[test]
fn sendfile_behind_nginx() {
    let dir = tempfile::tempdir().unwrap();
    let path = webp(&dir);

    let mut res = response();
    res.server_software("nginx/1.22.1");
    res.sendfile(&path, StatusCode::OK, None).unwrap();

    assert_eq!(res.get_header("X-Accel-Redirect"), [path.to_string_lossy()]);
    assert!(!res.has_header("X-Sendfile"));
    assert!(res.get_body().is_empty());
}

#[test]
fn sendfile_server_match_ignores_case() {
    let dir = tempfile::tempdir().unwrap();
    let path = webp(&dir);

    let mut res = response();
    res.server_software("NGINX");
    res.sendfile(&path, StatusCode::OK, None).unwrap();

    assert_eq!(res.get_header("X-Accel-Redirect"), [path.to_string_lossy()]);
    assert!(!res.has_header("X-Sendfile"));
}

#[test]
fn sendfile_behind_apache() {
    let dir = tempfile::tempdir().unwrap();
    let path = webp(&dir);

    let mut res = response();
    res.server_software("Apache/2.4.57");
    res.sendfile(&path, StatusCode::ACCEPTED, None).unwrap();

    assert_eq!(res.get_header("X-Sendfile"), [path.to_string_lossy()]);
    assert!(!res.has_header("X-Accel-Redirect"));
    assert_eq!(res.status_code(), StatusCode::ACCEPTED);
}

#[test]
fn sendfile_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = response()
        .sendfile(dir.path().join("nope.bin"), StatusCode::OK, None)
        .unwrap_err();
    assert!(matches!(err, Error::FileNotFound(_)));
}

// ── Hand-off ──────────────────────────────────────────────────────────────────

#[test]
fn into_http_keeps_headers_and_status() {
    let mut res = response();
    res.text("bye", StatusCode::SERVICE_UNAVAILABLE, None).unwrap();

    let http = res.into_http().unwrap();
    assert_eq!(http.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(http.headers()["content-type"], "text/plain");
}

#[test]
fn stream_bodies_are_adopted() {
    let mut res = Response::new(RawResponse::default());
    res.body(Body::from(b"raw bytes".to_vec())).unwrap();
    assert_eq!(res.get_body().size(), Some(9));
}
