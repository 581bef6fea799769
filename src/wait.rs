// ABOUTME: Polling loop that waits for a host to accept SSH connections.
// ABOUTME: Bounded by a maximum attempt count with a fixed sleep between attempts.

use crate::ssh::{Error, HostSession, Result, SessionConfig};
use std::future::Future;
use std::time::Duration;

/// How long to keep trying before declaring a host unreachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 100,
            interval: Duration::from_secs(5),
        }
    }
}

/// Connect repeatedly until the host answers, then close the probe session.
///
/// Only connection failures are retried; a rejected credential is returned
/// immediately. `on_retry` sees every failed attempt. Returns the number of
/// the attempt that succeeded.
pub async fn wait_for_host<F>(config: &SessionConfig, policy: &WaitPolicy, on_retry: F) -> Result<u32>
where
    F: FnMut(u32, &Error),
{
    retry(policy, &config.host, on_retry, || {
        let config = config.clone();
        async move {
            let mut session = HostSession::connect(config).await?;
            if let Err(e) = session.close().await {
                tracing::debug!(host = session.host(), "probe session close failed: {}", e);
            }
            Ok(())
        }
    })
    .await
}

async fn retry<A, Fut, R>(
    policy: &WaitPolicy,
    host: &str,
    mut on_retry: R,
    mut attempt: A,
) -> Result<u32>
where
    A: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
    R: FnMut(u32, &Error),
{
    for n in 1..=policy.max_attempts {
        match attempt().await {
            Ok(()) => {
                tracing::info!(host, attempt = n, "host is reachable");
                return Ok(n);
            }
            Err(e) if e.is_retryable() => {
                tracing::debug!(host, attempt = n, "attempt failed: {}", e);
                on_retry(n, &e);
                if n < policy.max_attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::Unreachable {
        host: host.to_string(),
        attempts: policy.max_attempts,
    })
}
