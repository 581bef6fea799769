// ABOUTME: SSH-specific error types.
// ABOUTME: Covers connection, authentication, channel, and file transfer failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("authentication failed for {user}@{host}")]
    Authentication { user: String, host: String },

    #[error("failed to load key from {path}: {reason}")]
    KeyLoadFailed { path: PathBuf, reason: String },

    #[error("channel error: {0}")]
    Channel(String),

    #[error("transfer failed for {path}: {reason}")]
    Transfer { path: String, reason: String },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("{host} not reachable after {attempts} attempt(s)")]
    Unreachable { host: String, attempts: u32 },

    #[error("SSH protocol error: {0}")]
    Protocol(#[from] russh::Error),

    #[error("SSH key error: {0}")]
    Key(#[from] russh::keys::Error),
}

impl Error {
    pub(crate) fn transfer(path: impl Into<String>, reason: impl ToString) -> Self {
        Error::Transfer {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn closed() -> Self {
        Error::Channel("session is closed".to_string())
    }

    /// Whether a later connection attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
