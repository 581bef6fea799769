// ABOUTME: SFTP file transfer on an established host session.
// ABOUTME: Opens an "sftp" subsystem channel per transfer and streams whole files.

use super::client::HostSession;
use super::error::{Error, Result};
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use std::future::Future;
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

impl HostSession {
    /// Copy a local file to `remote_path`, creating or truncating it.
    ///
    /// The remote parent directory must already exist. Returns the number of
    /// bytes written.
    #[instrument(skip(self), fields(host = %self.host()))]
    pub async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let description = format!(
            "File sent from path -> {} to path -> {} with {}",
            local_path.display(),
            remote_path,
            self.host()
        );
        self.log().info(
            self.host(),
            format!(
                "Sending file from {} to {}",
                local_path.display(),
                remote_path
            ),
        );
        self.logged_transfer(description, self.upload_inner(local_path, remote_path))
            .await
    }

    /// Copy `remote_path` to a local file, creating or truncating it.
    #[instrument(skip(self), fields(host = %self.host()))]
    pub async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let description = format!(
            "File get from path -> {} to path -> {} with {}",
            remote_path,
            local_path.display(),
            self.host()
        );
        self.log().info(
            self.host(),
            format!(
                "Getting file from {} to {}",
                remote_path,
                local_path.display()
            ),
        );
        self.logged_transfer(description, self.download_inner(remote_path, local_path))
            .await
    }

    async fn logged_transfer<F>(&self, description: String, transfer: F) -> Result<u64>
    where
        F: Future<Output = Result<u64>>,
    {
        let result = match self.config().transfer_timeout {
            Some(after) => tokio::time::timeout(after, transfer)
                .await
                .unwrap_or(Err(Error::Timeout {
                    operation: "transfer",
                    after,
                })),
            None => transfer.await,
        };

        match &result {
            Ok(bytes) => self
                .log()
                .info(self.host(), format!("{} ({} bytes)", description, bytes)),
            Err(e) => self.log().error(self.host(), format!("Transfer failed: {}", e)),
        }
        result
    }

    async fn upload_inner(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let local_name = local_path.display().to_string();
        let mut local = fs::File::open(local_path)
            .await
            .map_err(|e| Error::transfer(&local_name, e))?;

        let sftp = self.open_sftp().await?;
        let flags = OpenFlags::CREATE | OpenFlags::TRUNCATE | OpenFlags::WRITE;
        let mut remote = sftp
            .open_with_flags(remote_path, flags)
            .await
            .map_err(|e| Error::transfer(remote_path, e))?;
        debug!("opened remote file for writing");

        let bytes = copy_between(&mut local, &local_name, &mut remote, remote_path).await?;
        remote
            .flush()
            .await
            .map_err(|e| Error::transfer(remote_path, e))?;
        remote
            .shutdown()
            .await
            .map_err(|e| Error::transfer(remote_path, e))?;

        close_sftp(sftp).await;
        Ok(bytes)
    }

    async fn download_inner(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        let local_name = local_path.display().to_string();
        let sftp = self.open_sftp().await?;
        let mut remote = sftp
            .open(remote_path)
            .await
            .map_err(|e| Error::transfer(remote_path, e))?;
        debug!("opened remote file for reading");

        let mut local = fs::File::create(local_path)
            .await
            .map_err(|e| Error::transfer(&local_name, e))?;

        let bytes = copy_between(&mut remote, remote_path, &mut local, &local_name).await?;
        local
            .flush()
            .await
            .map_err(|e| Error::transfer(&local_name, e))?;

        close_sftp(sftp).await;
        Ok(bytes)
    }

    // Opens an SFTP client off a new "sftp" subsystem channel.
    async fn open_sftp(&self) -> Result<SftpSession> {
        let channel = self
            .handle()?
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(format!("failed to open SFTP channel: {}", e)))?;
        channel
            .request_subsystem(true, "sftp")
            .await
            .map_err(|e| Error::Channel(format!("failed to request SFTP subsystem: {}", e)))?;
        SftpSession::new(channel.into_stream())
            .await
            .map_err(|e| Error::Channel(format!("failed to initialize SFTP: {}", e)))
    }
}

const COPY_CHUNK: usize = 32 * 1024;

// Like `tokio::io::copy`, but a failure names the side that caused it.
async fn copy_between<R, W>(reader: &mut R, from: &str, writer: &mut W, to: &str) -> Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|e| Error::transfer(from, e))?;
        if n == 0 {
            return Ok(total);
        }
        writer
            .write_all(&buf[..n])
            .await
            .map_err(|e| Error::transfer(to, e))?;
        total += n as u64;
    }
}

async fn close_sftp(sftp: SftpSession) {
    if let Err(e) = sftp.close().await {
        debug!("SFTP session did not close cleanly: {}", e);
    }
}
