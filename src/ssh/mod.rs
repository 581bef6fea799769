// ABOUTME: SSH client module for per-host sessions.
// ABOUTME: Password or key authentication, command execution, and SFTP transfers.

mod client;
mod error;
mod remote;
mod sftp;

pub use client::{
    CommandOutput, Credential, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, HostSession, SessionConfig,
};
pub use error::{Error, Result};
pub use remote::Remote;
