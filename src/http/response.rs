//! HTTP response building module
//!
//! Provides builders for various HTTP status code responses, decoupled from specific business logic.
//! Every builder sets `Content-Length` explicitly so a HEAD response carries the
//! same headers as the matching GET while sending an empty body.

use futures::TryStreamExt;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::{Bytes, Frame};
use hyper::header::{HeaderValue, ALLOW};
use hyper::{Response, StatusCode};
use std::io;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

/// Read size for streamed file bodies
const FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Body of every response: buffered for generated pages, streamed for files
pub type ResponseBody = UnsyncBoxBody<Bytes, io::Error>;

pub fn full_body(data: impl Into<Bytes>) -> ResponseBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> ResponseBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

/// Stream at most `len` bytes of `file` in fixed-size chunks
pub fn file_body(file: File, len: u64) -> ResponseBody {
    let reader = ReaderStream::with_capacity(file.take(len), FILE_CHUNK_SIZE);
    StreamBody::new(reader.map_ok(Frame::data)).boxed_unsync()
}

/// Build 200 OK response for a file
///
/// `file` is `None` for HEAD; `len` comes from the file's metadata either way.
pub fn build_file_response(
    file: Option<File>,
    len: u64,
    content_type: &str,
    last_modified: Option<&str>,
) -> Response<ResponseBody> {
    let body = match file {
        Some(file) => file_body(file, len),
        None => empty_body(),
    };

    let mut builder = Response::builder()
        .status(200)
        .header("Content-Type", content_type)
        .header("Content-Length", len);
    if let Some(last_modified) = last_modified {
        builder = builder.header("Last-Modified", last_modified);
    }

    builder.body(body).unwrap_or_else(|e| {
        log_build_error("200", &e);
        Response::new(empty_body())
    })
}

/// Build generic HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<ResponseBody> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(200)
        .header("Content-Type", "text/html; charset=utf-8")
        .header("Content-Length", content_length)
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            Response::new(empty_body())
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(last_modified: &str) -> Response<ResponseBody> {
    Response::builder()
        .status(304)
        .header("Last-Modified", last_modified)
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(empty_body())
        })
}

/// Build 301 redirect response
pub fn build_301_response(location: &str, is_head: bool) -> Response<ResponseBody> {
    let message = "301 Moved Permanently";
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from_static(message.as_bytes())
    };

    Response::builder()
        .status(301)
        .header("Location", location)
        .header("Content-Type", "text/plain")
        .header("Content-Length", message.len())
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(empty_body())
        })
}

/// Build 400 Bad Request response
pub fn build_400_response(is_head: bool) -> Response<ResponseBody> {
    build_error_response(StatusCode::BAD_REQUEST, is_head)
}

/// Build 403 Forbidden response
pub fn build_403_response(is_head: bool) -> Response<ResponseBody> {
    build_error_response(StatusCode::FORBIDDEN, is_head)
}

/// Build 404 Not Found response
pub fn build_404_response(is_head: bool) -> Response<ResponseBody> {
    build_error_response(StatusCode::NOT_FOUND, is_head)
}

/// Build 500 Internal Server Error response
pub fn build_500_response(is_head: bool) -> Response<ResponseBody> {
    build_error_response(StatusCode::INTERNAL_SERVER_ERROR, is_head)
}

/// Build 501 Not Implemented response for unsupported methods
pub fn build_501_response() -> Response<ResponseBody> {
    let mut response = build_error_response(StatusCode::NOT_IMPLEMENTED, false);
    response
        .headers_mut()
        .insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
    response
}

/// Plain-text error page, e.g. `404 Not Found`
fn build_error_response(status: StatusCode, is_head: bool) -> Response<ResponseBody> {
    let message = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );
    let content_length = message.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(message)
    };

    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .header("Content-Length", content_length)
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            let mut fallback = Response::new(empty_body());
            *fallback.status_mut() = status;
            fallback
        })
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}
