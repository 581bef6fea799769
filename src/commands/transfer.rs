// ABOUTME: File transfer command implementations.
// ABOUTME: Upload to every host, download from the first host, flat directory upload.

use super::{Context, Tally};
use hostssh::diagnostics::Diagnostics;
use hostssh::error::{Error, Result};
use std::path::Path;

/// Upload one local file to `remote` on every host.
pub async fn upload(
    ctx: &Context<'_>,
    local: &Path,
    remote: &str,
    diag: &mut Diagnostics,
) -> Result<()> {
    let mut tally = Tally::default();
    for host in ctx.hosts() {
        let result = async {
            let session = ctx.connect(host).await?;
            ctx.output.status(
                &host.host,
                &format!("Sending file from {} to {}", local.display(), remote),
            );
            let sent = session.upload_file(local, remote).await;
            ctx.disconnect(session, diag).await;
            let bytes = sent?;
            ctx.output
                .status(&host.host, &format!("Sent {} bytes to {}", bytes, remote));
            Ok::<(), Error>(())
        }
        .await;
        tally.record(ctx.output, host, result);
    }
    tally.finish()
}

/// Download `remote` from the first host only.
pub async fn download(
    ctx: &Context<'_>,
    remote: &str,
    local: &Path,
    diag: &mut Diagnostics,
) -> Result<()> {
    let host = ctx.config.hosts.first();
    let session = ctx.connect(host).await?;
    ctx.output.status(
        &host.host,
        &format!("Getting file from {} to {}", remote, local.display()),
    );
    let received = session.download_file(remote, local).await;
    ctx.disconnect(session, diag).await;

    let bytes = received?;
    ctx.output.success(&format!(
        "Downloaded {} bytes from {}:{}",
        bytes, host.host, remote
    ));
    Ok(())
}

/// Upload the files directly inside `local_dir` into `remote_dir` on every host.
pub async fn upload_dir(
    ctx: &Context<'_>,
    local_dir: &Path,
    remote_dir: &str,
    diag: &mut Diagnostics,
) -> Result<()> {
    let mut tally = Tally::default();
    for host in ctx.hosts() {
        let result = async {
            let session = ctx.connect(host).await?;
            ctx.output.status(
                &host.host,
                &format!(
                    "Sending files from {} to {}",
                    local_dir.display(),
                    remote_dir
                ),
            );
            let sent = session.upload_directory(local_dir, remote_dir).await;
            ctx.disconnect(session, diag).await;
            let count = sent?;
            ctx.output
                .status(&host.host, &format!("Sent {} file(s) to {}", count, remote_dir));
            Ok::<(), Error>(())
        }
        .await;
        tally.record(ctx.output, host, result);
    }
    tally.finish()
}
