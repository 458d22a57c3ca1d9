//! Request dispatch module
//!
//! Entry point for HTTP request processing, responsible for method validation,
//! dispatching to the file server, and access logging.

use crate::config::AppState;
use crate::handler::static_files;
use crate::http::{self, ResponseBody};
use crate::logger::{self, AccessLogEntry};
use hyper::header::{HeaderValue, CONTENT_LENGTH, SERVER};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    /// Raw (percent-encoded) request path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_modified_since: Option<String>,
}

/// Main entry point for HTTP request handling
///
/// GET and HEAD carry no meaningful body, so only the request head is kept.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let (parts, _) = req.into_parts();
    let is_head = parts.method == Method::HEAD;

    // 1. Check HTTP method
    let mut response = if let Some(resp) = check_http_method(&parts.method) {
        resp
    } else {
        // 2. Extract headers and serve from the root
        let ctx = RequestContext {
            path: parts.uri.path(),
            query: parts.uri.query(),
            is_head,
            if_modified_since: parts
                .headers
                .get("if-modified-since")
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string),
        };
        static_files::serve(&ctx, &state).await
    };

    // 3. Identify the server
    if let Ok(server_name) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server_name);
    }

    // 4. Access log
    if state.config.logging.access_log {
        let entry = build_access_entry(&parts, &response, peer_addr, started);
        logger::log_access(&entry, &state.access_log_format);
    }

    Ok(response)
}

/// Only GET and HEAD are served; anything else gets 501
fn check_http_method(method: &Method) -> Option<Response<ResponseBody>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_warning(&format!("Unsupported method: {method}"));
            Some(http::build_501_response())
        }
    }
}

fn build_access_entry(
    req: &Parts,
    response: &Response<ResponseBody>,
    peer_addr: SocketAddr,
    started: Instant,
) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method.to_string(),
        req.uri.path().to_string(),
    );
    entry.query = req.uri.query().map(ToString::to_string);
    entry.http_version = version_label(req.version).to_string();
    entry.status = response.status().as_u16();
    // Streamed bodies have no exact size hint; Content-Length is authoritative
    entry.body_bytes = if req.method == Method::HEAD {
        0
    } else {
        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    };
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    entry
}

fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}
