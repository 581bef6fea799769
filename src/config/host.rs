// ABOUTME: Per-host inventory entry for SSH connections.
// ABOUTME: Parses "[user@]host[:port]", with IPv6 as "[addr]:port" or a bare address.

use super::EnvValue;
use crate::ssh::DEFAULT_PORT;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<EnvValue>,
    #[serde(default)]
    pub key_path: Option<PathBuf>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl HostConfig {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("host address cannot be empty".to_string());
        }

        // Parse format: [user@]host[:port]
        let (user_part, rest) = match s.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, s),
        };

        if user_part.is_some_and(str::is_empty) {
            return Err("user cannot be empty".to_string());
        }

        let (host, port) = split_host_port(rest)?;

        if host.is_empty() {
            return Err("hostname cannot be empty".to_string());
        }

        Ok(HostConfig {
            host: host.to_string(),
            port,
            user: user_part.map(|s| s.to_string()),
            password: None,
            key_path: None,
        })
    }
}

// "[v6]:port", "[v6]", bare "v6" (two or more colons, default port), "host:port" or "host".
fn split_host_port(s: &str) -> Result<(&str, u16), String> {
    if let Some(bracketed) = s.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| format!("missing ']' in address: {}", s))?;
        return match after {
            "" => Ok((host, DEFAULT_PORT)),
            _ => match after.strip_prefix(':') {
                Some(port) => Ok((host, parse_port(port)?)),
                None => Err(format!("unexpected text after ']': {}", after)),
            },
        };
    }

    if s.matches(':').count() > 1 {
        return Ok((s, DEFAULT_PORT));
    }

    match s.split_once(':') {
        Some((host, port)) => Ok((host, parse_port(port)?)),
        None => Ok((s, DEFAULT_PORT)),
    }
}

fn parse_port(s: &str) -> Result<u16, String> {
    s.parse::<u16>()
        .map_err(|_| format!("invalid port: {}", s))
}

impl FromStr for HostConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HostConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(user) = &self.user {
            write!(f, "{}@", user)?;
        }
        match (self.host.contains(':'), self.port != DEFAULT_PORT) {
            (true, true) => write!(f, "[{}]:{}", self.host, self.port)?,
            (false, true) => write!(f, "{}:{}", self.host, self.port)?,
            (_, false) => write!(f, "{}", self.host)?,
        }
        Ok(())
    }
}
