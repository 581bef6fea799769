// ABOUTME: The Remote trait: run commands and move files on one host.
// ABOUTME: Provides flat directory upload on top of single-file upload.

use super::client::{CommandOutput, HostSession};
use super::error::{Error, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Operations available on a connected host.
#[async_trait]
pub trait Remote: Send + Sync {
    fn host(&self) -> &str;

    fn is_alive(&self) -> bool;

    async fn run_command(&self, command: &str) -> Result<CommandOutput>;

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<u64>;

    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<u64>;

    async fn close(&mut self) -> Result<()>;

    /// Upload every regular file directly inside `local_dir` to `remote_dir`.
    ///
    /// Files go in name order. The first failure is returned as-is and files
    /// already uploaded stay in place. Returns the number of files uploaded.
    async fn upload_directory(&self, local_dir: &Path, remote_dir: &str) -> Result<usize> {
        let files = flat_files(local_dir).await?;
        for file in &files {
            let Some(name) = file.file_name() else {
                continue;
            };
            let remote = remote_join(remote_dir, &name.to_string_lossy());
            self.upload_file(file, &remote).await?;
        }
        Ok(files.len())
    }
}

#[async_trait]
impl Remote for HostSession {
    fn host(&self) -> &str {
        HostSession::host(self)
    }

    fn is_alive(&self) -> bool {
        HostSession::is_alive(self)
    }

    async fn run_command(&self, command: &str) -> Result<CommandOutput> {
        HostSession::run_command(self, command).await
    }

    async fn upload_file(&self, local_path: &Path, remote_path: &str) -> Result<u64> {
        HostSession::upload_file(self, local_path, remote_path).await
    }

    async fn download_file(&self, remote_path: &str, local_path: &Path) -> Result<u64> {
        HostSession::download_file(self, remote_path, local_path).await
    }

    async fn close(&mut self) -> Result<()> {
        HostSession::close(self).await
    }
}

impl HostSession {
    /// See [`Remote::upload_directory`].
    pub async fn upload_directory(&self, local_dir: &Path, remote_dir: &str) -> Result<usize> {
        Remote::upload_directory(self, local_dir, remote_dir).await
    }
}

// Regular files directly inside `dir`, sorted by name. Symlinks to files count
// as files; anything else is skipped.
async fn flat_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let dir_name = dir.display().to_string();
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| Error::transfer(&dir_name, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Error::transfer(&dir_name, e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Error::transfer(path.display().to_string(), e))?;
        let is_file = if file_type.is_symlink() {
            tokio::fs::metadata(&path).await.is_ok_and(|m| m.is_file())
        } else {
            file_type.is_file()
        };
        if is_file {
            files.push(path);
        } else {
            tracing::warn!(path = %path.display(), "skipping non-file entry");
        }
    }
    files.sort();
    Ok(files)
}

fn remote_join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), name)
    }
}
