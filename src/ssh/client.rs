// ABOUTME: Host session management using russh.
// ABOUTME: Handles connection, password or key authentication, command execution, and close.

use super::error::{Error, Result};
use crate::event_log::EventLog;
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{ChannelMsg, Disconnect, Sig};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub const DEFAULT_PORT: u16 = 22;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How the session proves its identity to the server.
#[derive(Clone)]
pub enum Credential {
    Password(String),
    KeyFile {
        path: PathBuf,
        passphrase: Option<String>,
    },
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(<redacted>)"),
            Credential::KeyFile { path, .. } => {
                f.debug_struct("KeyFile").field("path", path).finish()
            }
        }
    }
}

/// Configuration for establishing a host session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    pub credential: Credential,
    /// Bound on TCP connect plus SSH handshake.
    pub connect_timeout: Duration,
    /// Deadline applied to every command. None waits indefinitely.
    pub command_timeout: Option<Duration>,
    /// Deadline applied to every file transfer. None waits indefinitely.
    pub transfer_timeout: Option<Duration>,
    /// Whether to accept unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    pub event_log: EventLog,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>, credential: Credential) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            user: user.into(),
            credential,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: None,
            transfer_timeout: None,
            trust_on_first_use: false,
            known_hosts_path: None,
            event_log: EventLog::disabled(),
        }
    }

    pub fn with_password(
        host: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(host, user, Credential::Password(password.into()))
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout = Some(timeout);
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn event_log(mut self, log: EventLog) -> Self {
        self.event_log = log;
        self
    }
}

/// Output from a remote command execution.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code of the command, or 128 + signal number when it was killed.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Name of the signal that terminated the command, if any.
    pub signal: Option<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if self.trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learn_result = match &self.known_hosts_path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(russh::keys::Error::KeyChanged { .. }) => {
                tracing::error!("host key for {}:{} has changed", self.host, self.port);
                Ok(false)
            }
            // Unreadable known_hosts: treat as unknown host
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

// Shell convention: a command killed by signal N exits with 128 + N.
fn signal_exit_code(sig: &Sig) -> u32 {
    let number = match sig {
        Sig::HUP => 1,
        Sig::INT => 2,
        Sig::QUIT => 3,
        Sig::ILL => 4,
        Sig::ABRT => 6,
        Sig::FPE => 8,
        Sig::KILL => 9,
        Sig::USR1 => 10,
        Sig::SEGV => 11,
        Sig::PIPE => 13,
        Sig::ALRM => 14,
        Sig::TERM => 15,
        Sig::Custom(_) => return 255,
    };
    128 + number
}

fn signal_label(sig: &Sig) -> String {
    match sig {
        Sig::Custom(name) => name.clone(),
        other => format!("{:?}", other),
    }
}

fn lost_during_login(config: &SessionConfig, reason: impl fmt::Display) -> Error {
    Error::Connection(format!(
        "connection to {}:{} lost during authentication: {}",
        config.host, config.port, reason
    ))
}

/// An SSH connection to a single host.
///
/// The connection handle is present from a successful [`HostSession::connect`]
/// until [`HostSession::close`]; every operation on a closed session fails with
/// [`Error::Channel`].
pub struct HostSession {
    config: SessionConfig,
    handle: Option<Handle<SshHandler>>,
}

impl fmt::Debug for HostSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostSession")
            .field("config", &self.config)
            .field("handle", &self.handle.as_ref().map(|_| "<russh::Handle>"))
            .finish()
    }
}

impl HostSession {
    /// Connect and authenticate. Never yields a session without a live connection.
    #[instrument(skip_all, fields(host = %config.host, port = config.port))]
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let log = &config.event_log;
        log.info(&config.host, format!("Connecting to {}:{}", config.host, config.port));

        // One deadline covers TCP, key exchange and authentication
        let established = tokio::time::timeout(config.connect_timeout, Self::establish(&config))
            .await
            .unwrap_or_else(|_| {
                Err(Error::Connection(format!(
                    "timed out after {:?} connecting to {}:{}",
                    config.connect_timeout, config.host, config.port
                )))
            });

        match established {
            Ok(handle) => {
                log.info(&config.host, format!("Connected to {}", config.host));
                Ok(Self {
                    config,
                    handle: Some(handle),
                })
            }
            Err(e) => {
                log.error(&config.host, format!("Can't connect to '{}': {}", config.host, e));
                Err(e)
            }
        }
    }

    async fn establish(config: &SessionConfig) -> Result<Handle<SshHandler>> {
        // Load the key before touching the network so a bad path fails fast
        let key = match &config.credential {
            Credential::KeyFile { path, passphrase } => Some(
                load_secret_key(path, passphrase.as_deref()).map_err(|e| Error::KeyLoadFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                })?,
            ),
            Credential::Password(_) => None,
        };

        let russh_config = Config {
            keepalive_interval: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            trust_on_first_use: config.trust_on_first_use,
            known_hosts_path: config.known_hosts_path.clone(),
        };

        let connecting = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        );
        let mut handle = connecting.await.map_err(|e| {
            if e.to_string().contains("Connection refused") {
                Error::Connection(format!(
                    "connection refused to {}:{}",
                    config.host, config.port
                ))
            } else {
                Error::Connection(e.to_string())
            }
        })?;

        let authenticated = Self::authenticate(&mut handle, config, key)
            .await
            .map_err(|e| lost_during_login(config, e))?;

        if !authenticated {
            // A server that hangs up mid-login has not rejected the credential
            if handle.is_closed() {
                return Err(lost_during_login(config, "server closed the connection"));
            }
            return Err(Error::Authentication {
                user: config.user.clone(),
                host: config.host.clone(),
            });
        }

        Ok(handle)
    }

    async fn authenticate(
        handle: &mut Handle<SshHandler>,
        config: &SessionConfig,
        key: Option<ssh_key::PrivateKey>,
    ) -> std::result::Result<bool, russh::Error> {
        match (&config.credential, key) {
            (Credential::Password(password), _) => Ok(handle
                .authenticate_password(&config.user, password)
                .await?
                .success()),
            (Credential::KeyFile { .. }, Some(key)) => {
                let hash_alg = handle.best_supported_rsa_hash().await?.flatten();
                Ok(handle
                    .authenticate_publickey(
                        &config.user,
                        PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
                    )
                    .await?
                    .success())
            }
            (Credential::KeyFile { .. }, None) => Ok(false),
        }
    }

    pub fn host(&self) -> &str {
        &self.config.host
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn log(&self) -> &EventLog {
        &self.config.event_log
    }

    pub(crate) fn handle(&self) -> Result<&Handle<SshHandler>> {
        self.handle.as_ref().ok_or_else(Error::closed)
    }

    /// Whether the transport is still usable. Never fails.
    pub fn is_alive(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_closed())
    }

    /// Execute a command on the remote host.
    ///
    /// Uses the configured command timeout, if any.
    pub async fn run_command(&self, command: &str) -> Result<CommandOutput> {
        match self.config.command_timeout {
            Some(timeout) => self.run_command_with_timeout(command, timeout).await,
            None => self.run_logged(command).await,
        }
    }

    /// Execute a command with an explicit deadline.
    pub async fn run_command_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        match tokio::time::timeout(timeout, self.run_logged(command)).await {
            Ok(result) => result,
            Err(_) => {
                self.log().error(
                    self.host(),
                    format!("Command: {} timed out after {:?}", command, timeout),
                );
                Err(Error::Timeout {
                    operation: "command",
                    after: timeout,
                })
            }
        }
    }

    #[instrument(skip(self), fields(host = %self.config.host))]
    async fn run_logged(&self, command: &str) -> Result<CommandOutput> {
        let host = self.host();
        self.log()
            .info(host, format!("Running command: {} @ {}", command, host));

        let output = self.exec_inner(command).await.inspect_err(|e| {
            self.log()
                .error(host, format!("Command: {} failed on {}: {}", command, host, e));
        })?;

        let stdout = output.stdout.trim();
        if !stdout.is_empty() {
            self.log().info(
                host,
                format!("Command: {} output from {}:\n {}", command, host, stdout),
            );
        }
        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            self.log().error(
                host,
                format!("Command: {} error from {}:\n {}", command, host, stderr),
            );
        }
        if let Some(signal) = &output.signal {
            self.log().warn(
                host,
                format!("Command: {} on {} killed by signal {}", command, host, signal),
            );
        }
        tracing::debug!(exit_code = output.exit_code, "command finished");
        Ok(output)
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        let mut channel = self
            .handle()?
            .channel_open_session()
            .await
            .map_err(|e| Error::Channel(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::Channel(format!("failed to exec command: {}", e)))?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_code = None;
        let mut signal = None;
        let mut got_eof = false;

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext: 1 }) => {
                    stderr.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    exit_code = Some(exit_status);
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::ExitSignal { signal_name, .. }) => {
                    exit_code = Some(signal_exit_code(&signal_name));
                    signal = Some(signal_label(&signal_name));
                    if got_eof {
                        break;
                    }
                }
                Some(ChannelMsg::Eof) => {
                    got_eof = true;
                    if exit_code.is_some() {
                        break;
                    }
                }
                Some(ChannelMsg::Close) | None => break,
                Some(_) => {}
            }
        }

        // Closed without an exit status: the remote side or the transport went away
        let exit_code = exit_code.ok_or_else(|| {
            Error::Channel("channel closed unexpectedly without exit status".to_string())
        })?;

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            signal,
        })
    }

    /// Disconnect and release the connection.
    ///
    /// Closing an already-closed session is a caller error and returns
    /// [`Error::Channel`].
    #[instrument(skip(self), fields(host = %self.config.host))]
    pub async fn close(&mut self) -> Result<()> {
        let handle = self.handle.take().ok_or_else(Error::closed)?;
        let result = handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol);
        self.log()
            .info(self.host(), format!("Disconnecting from {}", self.host()));
        result
    }
}
