//! HTTP response handlers.

use anyhow::Result;
use tiny_http::{Header, Request, Response, StatusCode};

use crate::cache::RenderCache;
use crate::debug;
use crate::embed::serve::{INDEX_HTML, IndexVars};

/// Content types served by the preview endpoints.
pub mod mime {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const JSON: &str = "application/json";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
}

/// Respond with the page shell.
///
/// `port` is the effective listening port after bind retry, so the
/// shell's push channel connects to the listener that actually won.
pub fn respond_index(request: Request, port: u16, file_name: &str) -> Result<()> {
    let body = INDEX_HTML.render(&IndexVars {
        port,
        file_name: file_name.to_string(),
    });
    send_body(request, 200, mime::HTML, body.into_bytes())
}

/// Respond with the latest render as `{"contents": …, "ts": …}`.
pub fn respond_html(request: Request, cache: &RenderCache) -> Result<()> {
    let rendered = cache.current();
    debug!("serve"; "serving {} bytes rendered at {}", rendered.html.len(), rendered.rendered_at);
    let body = serde_json::to_vec(&*rendered)?;
    send_body(request, 200, mime::JSON, body)
}

/// Respond with 404 plain text.
pub fn respond_not_found(request: Request) -> Result<()> {
    send_body(request, 404, mime::PLAIN, b"404 Not Found".to_vec())
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_body(request, 503, mime::PLAIN, b"503 Service Unavailable".to_vec())
}

/// Respond with 400 for malformed upgrade requests.
pub fn respond_bad_request(request: Request, reason: &str) -> Result<()> {
    send_body(
        request,
        400,
        mime::PLAIN,
        format!("400 Bad Request: {reason}").into_bytes(),
    )
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
) -> Result<()> {
    let response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    request.respond(response)?;
    Ok(())
}

pub(super) fn make_header(key: &'static str, value: &str) -> Header {
    Header::from_bytes(key, value).unwrap()
}
