use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::config::TimeoutConfig;
use crate::error::ProxyError;
use crate::proxy::respond_text;

const TUNNEL_CHUNK_BYTES: usize = 64 * 1024;

/// HTTPS hosts known not to serve rewritable feeds; skip the warning noise.
const SAFE_CONNECT_HOSTS: &[&str] = &["prowlarr.servarr.com"];

/// Establish and pump an opaque CONNECT tunnel. Nothing in here sees
/// plaintext, so no rewriting happens on this path.
pub(crate) async fn handle_connect<S>(
    timeouts: &TimeoutConfig,
    client: &mut S,
    target: &str,
) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (host, port) = split_host_port(target);

    if !SAFE_CONNECT_HOSTS.contains(&host.as_str()) {
        warn!(
            "HTTPS CONNECT to {host}: titles cannot be rewritten inside an opaque tunnel; \
             set the indexer URL to http:// for rewriting to work"
        );
    }

    let connecting = TcpStream::connect((host.as_str(), port));
    let mut upstream = match timeout(Duration::from_secs(timeouts.connect_secs), connecting).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(err)) => {
            error!("CONNECT tunnel to {target} failed: {err}");
            respond_text(client, 502, "Bad Gateway", "tunnel connection failed").await?;
            return Ok(());
        }
        Err(_) => {
            error!("CONNECT tunnel to {target} timed out");
            respond_text(client, 502, "Bad Gateway", "tunnel connection timed out").await?;
            return Ok(());
        }
    };

    client
        .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
        .await?;
    client.flush().await?;

    relay(
        client,
        &mut upstream,
        Duration::from_secs(timeouts.tunnel_idle_secs),
    )
    .await
}

enum Leg {
    FromClient(std::io::Result<usize>),
    FromUpstream(std::io::Result<usize>),
}

/// Pump bytes in both directions until either side closes, errors, or the
/// idle timeout expires. Both streams drop together when this returns.
async fn relay<C, U>(client: &mut C, upstream: &mut U, idle: Duration) -> Result<(), ProxyError>
where
    C: AsyncRead + AsyncWrite + Unpin,
    U: AsyncRead + AsyncWrite + Unpin,
{
    let mut client_buf = vec![0u8; TUNNEL_CHUNK_BYTES];
    let mut upstream_buf = vec![0u8; TUNNEL_CHUNK_BYTES];

    loop {
        let readable = timeout(idle, async {
            tokio::select! {
                result = client.read(&mut client_buf) => Leg::FromClient(result),
                result = upstream.read(&mut upstream_buf) => Leg::FromUpstream(result),
            }
        })
        .await;

        match readable {
            Err(_) => {
                debug!("tunnel idle for {}s, closing", idle.as_secs());
                return Ok(());
            }
            Ok(Leg::FromClient(Ok(0))) | Ok(Leg::FromUpstream(Ok(0))) => return Ok(()),
            Ok(Leg::FromClient(Ok(n))) => {
                if upstream.write_all(&client_buf[..n]).await.is_err() {
                    return Ok(());
                }
            }
            Ok(Leg::FromUpstream(Ok(n))) => {
                if client.write_all(&upstream_buf[..n]).await.is_err() {
                    return Ok(());
                }
            }
            Ok(Leg::FromClient(Err(err))) | Ok(Leg::FromUpstream(Err(err))) => {
                debug!("tunnel I/O error, closing: {err}");
                return Ok(());
            }
        }
    }
}

fn split_host_port(target: &str) -> (String, u16) {
    if let Some((host, port)) = target.rsplit_once(':') {
        if let Ok(port) = port.parse::<u16>() {
            return (host.to_string(), port);
        }
    }
    (target.to_string(), 443)
}
