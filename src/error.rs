// ABOUTME: Application-wide error types for hostssh.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("no password or key configured for {0}")]
    MissingCredential(String),

    #[error("no hosts given: pass --host or list hosts in hostssh.yml")]
    NoHosts,

    #[error("command exited with code {exit_code} on {host}")]
    CommandFailed { host: String, exit_code: u32 },

    #[error("port {port} at {host} is closed")]
    PortClosed { host: String, port: u16 },

    #[error("{failed} of {total} host(s) failed")]
    HostsFailed { failed: usize, total: usize },

    #[error(transparent)]
    Ssh(#[from] crate::ssh::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
