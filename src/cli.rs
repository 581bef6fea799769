// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines global connection flags and all subcommands.

use clap::{Args, Parser, Subcommand};
use hostssh::config::HostConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostssh")]
#[command(about = "Run commands and move files on SSH hosts, one host at a time")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print command output and final results
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct ConnectionArgs {
    /// Inventory file (default: hostssh.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Target host as [user@]host[:port]; repeat for several hosts
    #[arg(short = 'H', long = "host", global = true)]
    pub hosts: Vec<HostConfig>,

    /// Login user for hosts that don't name one
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    /// Login password
    #[arg(long, global = true, env = "HOSTSSH_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Private key file used instead of a password
    #[arg(short, long, global = true)]
    pub identity: Option<PathBuf>,

    /// Seconds to wait for TCP connect and SSH handshake
    #[arg(long, global = true)]
    pub connect_timeout: Option<u64>,

    /// Directory for the per-run event log
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a hostssh.yml inventory in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Run a command on every host
    Run {
        /// Command line passed to the remote shell
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },

    /// Upload a file to every host
    Upload {
        local: PathBuf,
        remote: String,
    },

    /// Download a file from the first host
    Download {
        remote: String,
        local: PathBuf,
    },

    /// Upload the files directly inside a directory to every host
    UploadDir {
        local_dir: PathBuf,
        remote_dir: String,
    },

    /// Check whether each host's SSH port accepts connections
    CheckPort {
        /// Port to probe instead of the configured one
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Poll each host until it accepts SSH logins
    Wait {
        /// Give up after this many attempts
        #[arg(long, default_value = "100")]
        max_attempts: u32,

        /// Seconds between attempts
        #[arg(long, default_value = "5")]
        interval: u64,
    },

    /// Connect to each host and report whether the session is alive
    Status,
}
