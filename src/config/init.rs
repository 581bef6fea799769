// ABOUTME: Config scaffolding for new inventories.
// ABOUTME: Creates hostssh.yml template files.

use std::path::Path;

use crate::error::{Error, Result};

use super::{CONFIG_FILENAME, Config, HostConfig};

pub fn init_config(dir: &Path, hosts: &[HostConfig], force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template();
    if let Some(hosts) = nonempty::NonEmpty::from_slice(hosts) {
        config.hosts = hosts;
    }

    std::fs::write(&config_path, generate_template_yaml(&config))?;
    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    let hosts: String = config
        .hosts
        .iter()
        .map(|h| format!("  - {}\n", h))
        .collect();
    format!(
        r#"# Hosts are "[user@]host[:port]" strings or mappings with host/port/user/password/key_path.
hosts:
{}
user: {}
# Literal passwords work too; prefer reading them from the environment.
password:
  env: HOSTSSH_PASSWORD
# key_path: ~/.ssh/id_ed25519

connect_timeout: {}
# command_timeout: 5m
# transfer_timeout: 10m

# Accept and remember unknown host keys
trust_first_connection: {}

# One timestamped log file per run is created here
log_dir: {}
"#,
        hosts,
        config.user.as_deref().unwrap_or("root"),
        format!("{}s", config.connect_timeout.as_secs()),
        config.trust_first_connection,
        config
            .log_dir
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "logs".to_string()),
    )
}
