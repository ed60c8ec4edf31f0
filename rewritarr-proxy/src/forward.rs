use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use rewritarr_net::Request;
use rewritarr_rewrite::FeedOutcome;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, error};

use crate::error::ProxyError;
use crate::proxy::{ProxyState, respond_text};

/// Hop-specific request headers never forwarded upstream. Host and framing
/// are recomputed by the client, and content negotiation stays with it so
/// response bodies always arrive decompressed.
const HOP_REQUEST_HEADERS: &[&str] = &[
    "host",
    "proxy-connection",
    "proxy-authorization",
    "accept-encoding",
    "content-length",
    "connection",
];

/// Transport-framing response headers; content-length is recomputed from the
/// final body.
const SKIPPED_RESPONSE_HEADERS: &[&str] = &[
    "transfer-encoding",
    "content-length",
    "content-encoding",
    "connection",
];

/// Query markers identifying a newznab search call.
const SEARCH_MARKERS: &[&str] = &[
    "t=search",
    "t=tvsearch",
    "t=music",
    "t=book",
    "t=movie",
    "t=caps",
];

static APIKEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(apikey=)[^&]+").unwrap());

pub(crate) async fn handle_forward(
    state: &ProxyState,
    client: &mut TcpStream,
    request: &Request,
) -> Result<(), ProxyError> {
    let target = request.line.target.as_str();
    if !is_absolute_target(target) {
        respond_text(client, 400, "Bad Request", "not a proxy request (relative URL)").await?;
        return Ok(());
    }

    let log_url = redact_apikey(target);
    debug!("proxying {} {}", request.line.method, log_url);

    let Ok(method) = Method::from_bytes(request.line.method.as_bytes()) else {
        respond_text(client, 400, "Bad Request", "invalid method").await?;
        return Ok(());
    };

    let (status, headers, body) = match fetch_upstream(state, method, request).await {
        Ok(parts) => parts,
        Err(err) if err.is_timeout() => {
            error!("timeout proxying {log_url}");
            respond_text(client, 504, "Gateway Timeout", "upstream request timed out").await?;
            return Ok(());
        }
        Err(err) => {
            error!("error proxying {log_url}: {err}");
            respond_text(client, 502, "Bad Gateway", "upstream request failed").await?;
            return Ok(());
        }
    };

    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let body = if should_rewrite(content_type, &body, target) {
        debug!("processing newznab response ({} bytes)", body.len());
        match state.engine.process(&body) {
            FeedOutcome::Rewritten { body: rewritten, .. } => rewritten,
            FeedOutcome::Passthrough(reason) => {
                debug!("response forwarded unmodified: {reason}");
                body
            }
        }
    } else {
        body
    };

    write_response(client, status, &headers, &body).await
}

async fn fetch_upstream(
    state: &ProxyState,
    method: Method,
    request: &Request,
) -> Result<(StatusCode, HeaderMap, Vec<u8>), reqwest::Error> {
    let mut builder = state.client.request(method, request.line.target.as_str());
    for header in &request.headers {
        if HOP_REQUEST_HEADERS.contains(&header.name.as_str()) {
            continue;
        }
        builder = builder.header(header.name.as_str(), header.value.as_str());
    }
    if !request.body.is_empty() {
        builder = builder.body(request.body.clone());
    }

    let response = builder.send().await?;
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();
    Ok((status, headers, body))
}

async fn write_response(
    client: &mut TcpStream,
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), ProxyError> {
    let mut out = Vec::with_capacity(body.len() + 512);
    out.extend_from_slice(
        format!(
            "HTTP/1.1 {} {}\r\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .as_bytes(),
    );
    for (name, value) in headers {
        if SKIPPED_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        out.extend_from_slice(name.as_str().as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(format!("Content-Length: {}\r\n\r\n", body.len()).as_bytes());
    out.extend_from_slice(body);

    client.write_all(&out).await?;
    client.flush().await?;
    Ok(())
}

fn is_absolute_target(target: &str) -> bool {
    url::Url::parse(target)
        .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// A response is worth handing to the rewrite engine when it looks like a
/// feed and the request was a search call (capabilities responses carry no
/// items worth rewriting).
fn should_rewrite(content_type: &str, body: &[u8], target: &str) -> bool {
    let head = body[..body.len().min(200)].trim_ascii_start();
    let looks_like_feed = content_type.contains("xml")
        || content_type.contains("rss")
        || head.starts_with(b"<?xml")
        || head.starts_with(b"<rss");

    let is_search_call = target.contains("t=")
        && SEARCH_MARKERS.iter().any(|marker| target.contains(marker));

    looks_like_feed && is_search_call && !target.contains("t=caps")
}

fn redact_apikey(url: &str) -> String {
    APIKEY_PATTERN.replace_all(url, "${1}***").into_owned()
}
