// ABOUTME: Reachability command implementations.
// ABOUTME: Port checks, waiting for hosts to come up, and session liveness.

use super::{Context, Tally};
use hostssh::diagnostics::Diagnostics;
use hostssh::error::{Error, Result};
use hostssh::probe::probe_port;
use hostssh::wait::{WaitPolicy, wait_for_host};

/// Probe each host's SSH port (or `port_override`) with a plain TCP connect.
pub async fn check_port(ctx: &Context<'_>, port_override: Option<u16>) -> Result<()> {
    let mut tally = Tally::default();
    for host in ctx.hosts() {
        let port = port_override.unwrap_or(host.port);
        let result = if probe_port(&host.host, port, ctx.config.connect_timeout).await {
            ctx.output
                .status(&host.host, &format!("Port {} is open", port));
            Ok(())
        } else {
            Err(Error::PortClosed {
                host: host.host.clone(),
                port,
            })
        };
        tally.record(ctx.output, host, result);
    }
    tally.finish()
}

/// Block until every host accepts an SSH login, one host after another.
pub async fn wait(ctx: &Context<'_>, policy: &WaitPolicy) -> Result<()> {
    let mut tally = Tally::default();
    for host in ctx.hosts() {
        let result = async {
            let session_config = ctx.config.session_config(host, &ctx.log)?;
            ctx.output.status(&host.host, "Waiting for SSH...");
            let attempt = wait_for_host(&session_config, policy, |n, e| {
                ctx.output.status(
                    &host.host,
                    &format!(
                        "Attempting to connect: {} out of {} ({})",
                        n, policy.max_attempts, e
                    ),
                );
            })
            .await?;
            ctx.output.status(
                &host.host,
                &format!("Host is up (attempt {})", attempt),
            );
            Ok::<(), Error>(())
        }
        .await;
        tally.record(ctx.output, host, result);
    }
    tally.finish()
}

/// Connect to each host and report whether the session is usable.
pub async fn status(ctx: &Context<'_>, diag: &mut Diagnostics) -> Result<()> {
    let mut tally = Tally::default();
    for host in ctx.hosts() {
        let result = async {
            let session = ctx.connect(host).await?;
            let alive = session.is_alive();
            ctx.output.status(
                &host.host,
                if alive { "Session alive" } else { "Session not alive" },
            );
            ctx.disconnect(session, diag).await;
            Ok::<(), Error>(())
        }
        .await;
        tally.record(ctx.output, host, result);
    }
    tally.finish()
}
