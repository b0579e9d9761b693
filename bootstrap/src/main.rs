//! Container entrypoint for the competitions service.
//!
//! Waits for PostgreSQL to accept connections, applies schema migrations,
//! then runs the server command given after `--`, forwarding its exit
//! status as this process's own.

use std::process;
use std::time::Duration;

use clap::Parser;
use competitions_bootstrap::{BootstrapConfig, BootstrapError, CommandSpec};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Startup sequencer for the competitions service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "competitions-bootstrap")]
struct Cli {
    /// Database host (overrides POSTGRES_HOST)
    #[arg(long, value_name = "HOST")]
    db_host: Option<String>,

    /// Database port (overrides POSTGRES_PORT)
    #[arg(long, value_name = "PORT")]
    db_port: Option<u16>,

    /// Seconds to wait for the database before giving up
    #[arg(long, value_name = "SECS")]
    wait_timeout: Option<u64>,

    /// Seconds between connection attempts
    #[arg(long, value_name = "SECS")]
    retry_interval: Option<u64>,

    /// Migration command, whitespace-separated
    #[arg(long, env = "MIGRATION_COMMAND", value_name = "COMMAND")]
    migrate_command: String,

    /// Server command to hand off to once the database is ready
    #[arg(trailing_var_arg = true, required = true, value_name = "SERVER_COMMAND")]
    server_command: Vec<String>,
}

#[tokio::main]
async fn main() {
    // Load .env before clap so MIGRATION_COMMAND from a .env file is seen.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_tracing();

    let code = match bootstrap(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "bootstrap failed");
            err.exit_code()
        }
    };
    process::exit(code);
}

async fn bootstrap(cli: Cli) -> Result<i32, BootstrapError> {
    let mut config = BootstrapConfig::from_env()?;
    if let Some(host) = cli.db_host {
        config = config.with_host(host);
    }
    if let Some(port) = cli.db_port {
        config = config.with_port(port);
    }
    if let Some(secs) = cli.wait_timeout {
        config = config.with_wait_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = cli.retry_interval {
        config = config.with_retry_interval(Duration::from_secs(secs));
    }

    let migration = CommandSpec::parse(&cli.migrate_command)?;
    let server = CommandSpec::from_argv(cli.server_command)?;

    info!(
        database = %config.address(),
        migration = %migration,
        "starting bootstrap sequence"
    );

    competitions_bootstrap::run(&config, &migration, &server).await
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
