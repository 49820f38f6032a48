//! Plain HTTP requests on the signaling port
//!
//! Anything that is not a WebSocket upgrade lands here: the landing page,
//! static assets and a health probe. Only GET and HEAD are served.

use std::path::Path;

use tracing::debug;

use switchboard_core::path::{safe_path, safe_real_path};
use switchboard_core::HttpConfig;

/// Served for `/` when the asset directory has no index.html
pub const LANDING_PAGE: &str = "<h1>Hello World</h1>";

/// Largest request head accepted before the connection is dropped
pub const MAX_REQUEST_HEAD: usize = 8 * 1024;

/// The parsed request line and the headers we care about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    /// Request target without the query string
    pub path: String,
    /// `Upgrade: websocket` was present
    pub upgrade: bool,
    /// Length of the head in bytes, including the blank line
    pub len: usize,
}

/// Parse an HTTP/1.x request head
///
/// Returns `None` until the terminating blank line has been received, or if
/// the request line is malformed.
pub fn parse_request_head(buf: &[u8]) -> Option<RequestHead> {
    let end = buf.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let text = String::from_utf8_lossy(&buf[..end]);
    let mut lines = text.split("\r\n");

    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?;
    let path = target.split('?').next().unwrap_or("/").to_string();

    let upgrade = lines
        .filter_map(|line| line.split_once(':'))
        .any(|(name, value)| {
            name.trim().eq_ignore_ascii_case("upgrade")
                && value
                    .split(',')
                    .any(|token| token.trim().eq_ignore_ascii_case("websocket"))
        });

    Some(RequestHead {
        method,
        path,
        upgrade,
        len: end,
    })
}

/// A complete response ready to be written
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    /// Send headers only
    pub head_only: bool,
}

impl HttpResponse {
    fn new(status: &'static str, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            head_only: false,
        }
    }

    fn not_found() -> Self {
        Self::new("404 Not Found", "application/json", r#"{"error":"not found"}"#)
    }

    /// Serialize status line, headers and (unless HEAD) body
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status,
            self.content_type,
            self.body.len()
        )
        .into_bytes();
        if !self.head_only {
            out.extend_from_slice(&self.body);
        }
        out
    }
}

/// Build the response for a non-upgrade request
pub async fn respond(head: &RequestHead, http: &HttpConfig, peers: usize) -> HttpResponse {
    let head_only = head.method == "HEAD";
    if head.method != "GET" && !head_only {
        return HttpResponse::new(
            "405 Method Not Allowed",
            "application/json",
            r#"{"error":"method not allowed"}"#,
        );
    }

    let mut response = match head.path.as_str() {
        "/health" => HttpResponse::new(
            "200 OK",
            "application/json",
            format!(r#"{{"status":"healthy","peers":{}}}"#, peers),
        ),
        "/" | "/index.html" => match static_file(http, "/index.html").await {
            Some(response) => response,
            None => HttpResponse::new("200 OK", "text/html; charset=utf-8", LANDING_PAGE),
        },
        path => static_file(http, path)
            .await
            .unwrap_or_else(HttpResponse::not_found),
    };

    response.head_only = head_only;
    response
}

/// Look up the percent-encoded request `path` under the asset directory
async fn static_file(http: &HttpConfig, path: &str) -> Option<HttpResponse> {
    if !http.serve_static {
        return None;
    }

    let decoded = match urlencoding::decode(path) {
        Ok(decoded) => decoded,
        Err(e) => {
            debug!("Undecodable asset path {:?}: {}", path, e);
            return None;
        }
    };

    // a decoded %2e%2e or %00 is caught here like its literal form
    let candidate = match safe_path(&http.public_dir, &decoded) {
        Ok(candidate) => candidate,
        Err(e) => {
            debug!("Rejected asset path {:?}: {}", path, e);
            return None;
        }
    };

    if !candidate.is_file() {
        return None;
    }

    let resolved = match safe_real_path(&http.public_dir, &candidate) {
        Ok(resolved) => resolved,
        Err(e) => {
            debug!("Rejected asset path {:?}: {}", path, e);
            return None;
        }
    };

    match tokio::fs::read(&resolved).await {
        Ok(body) => Some(HttpResponse::new("200 OK", content_type(&resolved), body)),
        Err(e) => {
            debug!("Failed to read {:?}: {}", resolved, e);
            None
        }
    }
}

/// Content type by file extension
pub fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "text/javascript; charset=utf-8",
        Some("json") | Some("map") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
