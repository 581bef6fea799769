// ABOUTME: Run command implementation.
// ABOUTME: Executes one shell command on every host in turn.

use super::{Context, Tally};
use hostssh::config::HostConfig;
use hostssh::diagnostics::Diagnostics;
use hostssh::error::{Error, Result};

/// Run `command` on every host; a non-zero exit counts as a failure for that host.
pub async fn run(ctx: &Context<'_>, command: &str, diag: &mut Diagnostics) -> Result<()> {
    let mut tally = Tally::default();
    for host in ctx.hosts() {
        let result = run_on_host(ctx, host, command, diag).await;
        tally.record(ctx.output, host, result);
    }
    tally.finish()
}

async fn run_on_host(
    ctx: &Context<'_>,
    host: &HostConfig,
    command: &str,
    diag: &mut Diagnostics,
) -> Result<()> {
    let session = ctx.connect(host).await?;

    ctx.output
        .status(&host.host, &format!("Running command: {}", command));
    let result = session.run_command(command).await;
    ctx.disconnect(session, diag).await;

    let output = result?;
    ctx.output
        .command_output(&host.host, &output.stdout, &output.stderr);
    if !output.success() {
        return Err(Error::CommandFailed {
            host: host.host.clone(),
            exit_code: output.exit_code,
        });
    }
    Ok(())
}
