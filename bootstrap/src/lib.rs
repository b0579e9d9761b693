//! # Competitions Bootstrap
//!
//! Startup sequencer for the competitions service. The binary runs as the
//! container entrypoint and gates the API server behind two preconditions:
//!
//! 1. **Database reachability**: PostgreSQL accepts TCP connections.
//! 2. **Schema currency**: the migration command has run to completion.
//!
//! Once both hold, the server command supplied on the command line runs with
//! inherited standard streams and its exit status becomes the sequencer's
//! own. Neither failure mode is recoverable at this layer; restart policy
//! belongs to whatever supervisor launched the container.
//!
//! ## Example
//!
//! ```ignore
//! use competitions_bootstrap::{BootstrapConfig, CommandSpec};
//!
//! let config = BootstrapConfig::from_env()?;
//! let migration = CommandSpec::parse("competitions-server migrate")?;
//! let server = CommandSpec::from_argv(server_argv)?;
//!
//! let code = competitions_bootstrap::run(&config, &migration, &server).await?;
//! std::process::exit(code);
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod command;
pub mod config;
pub mod error;
pub mod wait;

pub use command::CommandSpec;
pub use config::BootstrapConfig;
pub use error::BootstrapError;

use tracing::info;

/// Run the full bootstrap sequence.
///
/// Waits for the configured database endpoint to accept a TCP connection,
/// runs the migration command exactly once, then hands off to the server
/// command and returns its exit code. The migration command is assumed
/// idempotent and safe to run on every startup.
///
/// # Errors
///
/// - [`BootstrapError::DependencyUnavailable`] if the database never becomes
///   reachable within the configured deadline; the migration command is not
///   invoked in that case.
/// - [`BootstrapError::StepFailed`] if the migration command exits non-zero;
///   the server command is not started in that case.
/// - [`BootstrapError::Spawn`] if either command cannot be started.
pub async fn run(
    config: &BootstrapConfig,
    migration: &CommandSpec,
    server: &CommandSpec,
) -> Result<i32, BootstrapError> {
    wait::wait_for_database(config).await?;
    command::run_step("migrate", migration).await?;
    info!(command = %server, "handing off to server command");
    command::handoff(server).await
}
