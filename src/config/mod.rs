// ABOUTME: Configuration types and parsing for hostssh.yml.
// ABOUTME: Handles YAML parsing, shared credentials, env var secrets, and session setup.

mod deserialize;
mod env_value;
mod host;
mod init;

pub use env_value::EnvValue;
pub use host::HostConfig;
pub use init::init_config;

use crate::error::{Error, Result};
use crate::event_log::EventLog;
use crate::ssh::{Credential, DEFAULT_CONNECT_TIMEOUT, SessionConfig};
use deserialize::deserialize_hosts;
use nonempty::NonEmpty;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "hostssh.yml";
pub const CONFIG_FILENAME_ALT: &str = "hostssh.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".hostssh/config.yml";

/// Inventory of hosts plus settings shared by all of them.
///
/// Per-host `user`, `password` and `key_path` take precedence over the
/// top-level values.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_hosts")]
    pub hosts: NonEmpty<HostConfig>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<EnvValue>,

    #[serde(default)]
    pub key_path: Option<PathBuf>,

    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub transfer_timeout: Option<Duration>,

    #[serde(default = "default_trust_first_connection")]
    pub trust_first_connection: bool,

    #[serde(default)]
    pub known_hosts: Option<PathBuf>,

    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_trust_first_connection() -> bool {
    true
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    /// A config with only `hosts` set and every other field at its default.
    pub fn from_hosts(hosts: NonEmpty<HostConfig>) -> Self {
        Config {
            hosts,
            user: None,
            password: None,
            key_path: None,
            connect_timeout: default_connect_timeout(),
            command_timeout: None,
            transfer_timeout: None,
            trust_first_connection: default_trust_first_connection(),
            known_hosts: None,
            log_dir: None,
        }
    }

    /// Resolve the user for `host`: host entry, then top level, then `$USER`, then root.
    pub fn user_for(&self, host: &HostConfig) -> String {
        host.user
            .clone()
            .or_else(|| self.user.clone())
            .unwrap_or_else(|| std::env::var("USER").unwrap_or_else(|_| "root".to_string()))
    }

    /// Resolve the credential for `host`, preferring host-level settings.
    pub fn credential_for(&self, host: &HostConfig) -> Result<Credential> {
        let levels = [
            (host.password.as_ref(), host.key_path.as_ref()),
            (self.password.as_ref(), self.key_path.as_ref()),
        ];
        for (password, key_path) in levels {
            if let Some(password) = password {
                return Ok(Credential::Password(password.resolve()?));
            }
            if let Some(path) = key_path {
                return Ok(Credential::KeyFile {
                    path: path.clone(),
                    passphrase: None,
                });
            }
        }
        Err(Error::MissingCredential(host.host.clone()))
    }

    /// Build the session settings for one inventory entry.
    pub fn session_config(&self, host: &HostConfig, log: &EventLog) -> Result<SessionConfig> {
        let mut config = SessionConfig::new(&host.host, self.user_for(host), self.credential_for(host)?)
            .port(host.port)
            .connect_timeout(self.connect_timeout)
            .trust_on_first_use(self.trust_first_connection)
            .event_log(log.clone());
        if let Some(timeout) = self.command_timeout {
            config = config.command_timeout(timeout);
        }
        if let Some(timeout) = self.transfer_timeout {
            config = config.transfer_timeout(timeout);
        }
        if let Some(path) = &self.known_hosts {
            config = config.known_hosts_path(path);
        }
        Ok(config)
    }

    pub fn template() -> Self {
        let mut config = Config::from_hosts(NonEmpty::new(HostConfig {
            host: "192.168.1.104".to_string(),
            port: 22,
            user: None,
            password: None,
            key_path: None,
        }));
        config.user = Some("root".to_string());
        config.password = Some(EnvValue::FromEnv {
            var: "HOSTSSH_PASSWORD".to_string(),
            default: None,
        });
        config.log_dir = Some(PathBuf::from("logs"));
        config
    }
}
