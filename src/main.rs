// ABOUTME: Entry point for the hostssh CLI application.
// ABOUTME: Parses arguments, builds the host inventory, and dispatches commands.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands, ConnectionArgs};
use commands::Context;
use hostssh::config::{self, Config};
use hostssh::diagnostics::{Diagnostics, Warning};
use hostssh::error::{Error, Result};
use hostssh::event_log::EventLog;
use hostssh::output::{Output, OutputMode};
use hostssh::wait::WaitPolicy;
use nonempty::NonEmpty;
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);
    output.start_timer();

    let mut diag = Diagnostics::default();
    let result = run(cli, &output, &mut diag).await;

    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    if let Err(e) = result {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &Output, diag: &mut Diagnostics) -> Result<()> {
    let cwd = env::current_dir()?;

    if let Commands::Init { force } = cli.command {
        config::init_config(&cwd, &cli.connection.hosts, force)?;
        output.success(&format!("Created {}", config::CONFIG_FILENAME));
        return Ok(());
    }

    let config = load_config(&cli.connection, &cwd)?;
    let log = open_event_log(&config, diag);
    let ctx = Context::new(config, log, output);

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Run { command } => commands::run(&ctx, &command.join(" "), diag).await,
        Commands::Upload { local, remote } => {
            commands::upload(&ctx, &local, &remote, diag).await
        }
        Commands::Download { remote, local } => {
            commands::download(&ctx, &remote, &local, diag).await
        }
        Commands::UploadDir {
            local_dir,
            remote_dir,
        } => commands::upload_dir(&ctx, &local_dir, &remote_dir, diag).await,
        Commands::CheckPort { port } => commands::check_port(&ctx, port).await,
        Commands::Wait {
            max_attempts,
            interval,
        } => {
            let policy = WaitPolicy {
                max_attempts,
                interval: Duration::from_secs(interval),
            };
            commands::wait(&ctx, &policy).await
        }
        Commands::Status => commands::status(&ctx, diag).await,
    }
}

/// Inventory file (explicit or discovered) with command-line overrides applied.
fn load_config(args: &ConnectionArgs, cwd: &Path) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => match Config::discover(cwd) {
            Ok(config) => config,
            Err(Error::ConfigNotFound(_)) => {
                let hosts = NonEmpty::from_slice(&args.hosts).ok_or(Error::NoHosts)?;
                Config::from_hosts(hosts)
            }
            Err(e) => return Err(e),
        },
    };

    if let Some(hosts) = NonEmpty::from_slice(&args.hosts) {
        config.hosts = hosts;
    }
    if let Some(user) = &args.user {
        config.user = Some(user.clone());
    }
    if let Some(password) = &args.password {
        config.password = Some(config::EnvValue::Literal(password.clone()));
    }
    if let Some(identity) = &args.identity {
        config.key_path = Some(identity.clone());
        // An explicit key beats an inherited password
        if args.password.is_none() {
            config.password = None;
        }
    }
    if let Some(secs) = args.connect_timeout {
        config.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = Some(dir.clone());
    }
    Ok(config)
}

fn open_event_log(config: &Config, diag: &mut Diagnostics) -> EventLog {
    let Some(dir) = &config.log_dir else {
        return EventLog::disabled();
    };
    match EventLog::create(dir) {
        Ok(log) => log,
        Err(e) => {
            diag.warn(Warning::event_log(format!(
                "could not create event log in {}: {}",
                dir.display(),
                e
            )));
            EventLog::disabled()
        }
    }
}
