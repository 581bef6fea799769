// ABOUTME: TCP reachability probe for a host's SSH port.
// ABOUTME: Reports open/closed without speaking any protocol.

use std::time::Duration;
use tokio::net::TcpStream;

/// Whether `host:port` accepts a TCP connection within `timeout`.
///
/// Refusal, name resolution failure and timeout all count as closed.
pub async fn probe_port(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_stream)) => {
            tracing::debug!(host, port, "port open");
            true
        }
        Ok(Err(e)) => {
            tracing::debug!(host, port, "port closed: {}", e);
            false
        }
        Err(_) => {
            tracing::debug!(host, port, "port probe timed out after {:?}", timeout);
            false
        }
    }
}
