// ABOUTME: Command handlers for the hostssh CLI.
// ABOUTME: Each handler visits the inventory one host at a time.

mod probe;
mod run;
mod transfer;

pub use probe::{check_port, status, wait};
pub use run::run;
pub use transfer::{download, upload, upload_dir};

use hostssh::config::{Config, HostConfig};
use hostssh::diagnostics::{Diagnostics, Warning};
use hostssh::error::{Error, Result};
use hostssh::event_log::EventLog;
use hostssh::output::Output;
use hostssh::ssh::HostSession;

/// Everything a command needs to reach the hosts.
pub struct Context<'a> {
    pub config: Config,
    pub log: EventLog,
    pub output: &'a Output,
}

impl<'a> Context<'a> {
    pub fn new(config: Config, log: EventLog, output: &'a Output) -> Self {
        Self {
            config,
            log,
            output,
        }
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostConfig> {
        self.config.hosts.iter()
    }

    /// Open a session to one inventory entry.
    pub async fn connect(&self, host: &HostConfig) -> Result<HostSession> {
        let session_config = self.config.session_config(host, &self.log)?;
        self.output.status(&host.host, "Connecting...");
        let session = HostSession::connect(session_config).await?;
        self.output.status(&host.host, "Connection established!");
        Ok(session)
    }

    /// Close a session; a failed disconnect is only a warning.
    pub async fn disconnect(&self, mut session: HostSession, diag: &mut Diagnostics) {
        match session.close().await {
            Ok(()) => self.output.status(session.host(), "Disconnected"),
            Err(e) => diag.warn(Warning::ssh_disconnect(format!(
                "SSH disconnect failed for {}: {}",
                session.host(),
                e
            ))),
        }
    }
}

/// Per-host outcomes of a command that visits several hosts.
#[derive(Default)]
pub struct Tally {
    total: usize,
    failures: Vec<Error>,
}

impl Tally {
    /// Record one host's result, reporting failures as they happen.
    pub fn record(&mut self, output: &Output, host: &HostConfig, result: Result<()>) {
        self.total += 1;
        if let Err(e) = result {
            output.error(&format!("{}: {}", host.host, e));
            self.failures.push(e);
        }
    }

    /// A single failing host keeps its own error; several are summarised.
    pub fn finish(mut self) -> Result<()> {
        match self.failures.len() {
            0 => Ok(()),
            1 if self.total == 1 => Err(self.failures.remove(0)),
            failed => Err(Error::HostsFailed {
                failed,
                total: self.total,
            }),
        }
    }
}
