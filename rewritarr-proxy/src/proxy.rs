use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use rewritarr_net::{ParseStatus, RequestParser};
use rewritarr_rewrite::RewriteEngine;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpSocket, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::{forward, tunnel};

pub struct Proxy {
    state: Arc<ProxyState>,
}

pub(crate) struct ProxyState {
    pub(crate) config: ProxyConfig,
    pub(crate) client: reqwest::Client,
    pub(crate) engine: RewriteEngine,
}

impl Proxy {
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs));
        if let Some(upstream) = &config.upstream {
            builder = builder.proxy(reqwest::Proxy::all(upstream.url())?);
        }
        let client = builder.build()?;
        let engine = RewriteEngine::new(config.rewrite.clone());

        Ok(Self {
            state: Arc::new(ProxyState {
                config,
                client,
                engine,
            }),
        })
    }

    /// Accept connections until the shutdown receiver fires, spawning one
    /// task per connection. In-flight handlers drain on their own; only the
    /// listener stops.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), ProxyError> {
        let address = format!(
            "{}:{}",
            self.state.config.listen.host, self.state.config.listen.port
        );
        let address: SocketAddr = address
            .parse()
            .map_err(|_| ProxyError::Config(format!("invalid listen address {address}")))?;

        let socket = if address.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(address)?;
        let listener = socket.listen(128)?;
        info!("HTTP proxy listening on {address}");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(state, stream).await {
                            debug!("connection from {peer} closed with error: {err}");
                        }
                    });
                }
                _ = shutdown.changed() => {
                    info!("stopping listener, draining in-flight connections");
                    return Ok(());
                }
            }
        }
    }
}

async fn handle_connection(state: Arc<ProxyState>, mut client: TcpStream) -> Result<(), ProxyError> {
    let mut parser = RequestParser::new();
    let mut buffer = vec![0u8; 8192];

    loop {
        let n = client.read(&mut buffer).await?;
        if n == 0 {
            return Ok(());
        }

        let mut chunk = &buffer[..n];
        loop {
            match parser.push(chunk) {
                ParseStatus::NeedMore { .. } => break,
                ParseStatus::Error { error, .. } => {
                    respond_text(&mut client, 400, "Bad Request", "malformed request").await?;
                    return Err(ProxyError::Runtime(format!("request parse error: {error}")));
                }
                ParseStatus::Complete { request, warnings } => {
                    for warning in warnings {
                        debug!("request parse warning: {:?}", warning.kind);
                    }
                    match request.line.method.to_ascii_uppercase().as_str() {
                        "CONNECT" => {
                            tunnel::handle_connect(
                                &state.config.timeouts,
                                &mut client,
                                &request.line.target,
                            )
                            .await?;
                            return Ok(());
                        }
                        "GET" | "POST" => {
                            forward::handle_forward(&state, &mut client, &request).await?;
                        }
                        other => {
                            debug!("unsupported method {other}");
                            respond_text(&mut client, 501, "Not Implemented", "unsupported method")
                                .await?;
                            return Ok(());
                        }
                    }
                    chunk = &[];
                }
            }
        }
    }
}

/// Best-effort plain-text response, used for every locally generated error.
pub(crate) async fn respond_text<S>(
    client: &mut S,
    status: u16,
    reason: &str,
    body: &str,
) -> Result<(), ProxyError>
where
    S: AsyncWrite + Unpin,
{
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {length}\r\nConnection: close\r\n\r\n{body}",
        length = body.len(),
    );
    client.write_all(response.as_bytes()).await?;
    client.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::respond_text;

    #[tokio::test]
    async fn respond_text_writes_a_complete_response() {
        let mut sink = Vec::new();
        respond_text(&mut sink, 502, "Bad Gateway", "tunnel connection failed")
            .await
            .unwrap();

        let response = String::from_utf8(sink).unwrap();
        assert!(response.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
        assert!(response.contains("Content-Length: 24\r\n"));
        assert!(response.ends_with("\r\n\r\ntunnel connection failed"));
    }
}
