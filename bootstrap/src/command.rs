//! External command execution: bootstrap steps and the final handoff.
//!
//! Both the migration step and the server command run with inherited
//! standard streams, so their output lands in the container log exactly as
//! if they had been started directly.

use std::fmt;
use std::process::ExitStatus;

use tokio::process::Command;
use tracing::{error, info};

use crate::error::BootstrapError;

/// A program with its argument vector.
///
/// Argument vectors are carried verbatim through to the spawned process;
/// the sequencer never rewrites, splits, or reorders them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    /// Build a spec from an argument vector; the first element is the
    /// program, the rest its arguments.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Config`] when `argv` is empty.
    pub fn from_argv(mut argv: Vec<String>) -> Result<Self, BootstrapError> {
        if argv.is_empty() {
            return Err(BootstrapError::Config("command must not be empty".to_string()));
        }
        let args = argv.split_off(1);
        let program = argv.remove(0);
        Ok(Self { program, args })
    }

    /// Split a whitespace-separated command string.
    ///
    /// No shell quoting is applied; a command whose arguments contain
    /// whitespace must be built through [`CommandSpec::from_argv`].
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Config`] when the string contains no words.
    pub fn parse(command: &str) -> Result<Self, BootstrapError> {
        Self::from_argv(command.split_whitespace().map(str::to_string).collect())
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments, in the order they will be passed.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Run a bootstrap step to completion.
///
/// Steps are not retried: one non-zero exit halts the whole startup
/// sequence, leaving restart policy to the external supervisor.
///
/// # Errors
///
/// - [`BootstrapError::Spawn`] when the command cannot be started.
/// - [`BootstrapError::StepFailed`] when it exits unsuccessfully; the exit
///   status is preserved for propagation.
pub async fn run_step(step: &'static str, spec: &CommandSpec) -> Result<(), BootstrapError> {
    info!(step, command = %spec, "running step");

    let status = spawn_and_wait(spec).await?;
    if status.success() {
        info!(step, "step complete");
        Ok(())
    } else {
        error!(step, status = status.code(), "step failed");
        Err(BootstrapError::StepFailed {
            step,
            status: status.code(),
        })
    }
}

/// Run the server command and surface its exit code as our own.
///
/// True process replacement is deliberately not used: the child runs with
/// inherited standard streams and the sequencer forwards the child's exit
/// status, which preserves the observable contract (stdio passthrough,
/// status propagation) without platform-specific `exec` semantics.
///
/// # Errors
///
/// [`BootstrapError::Spawn`] when the command cannot be started.
pub async fn handoff(spec: &CommandSpec) -> Result<i32, BootstrapError> {
    let status = spawn_and_wait(spec).await?;
    Ok(forwarded_exit_code(status))
}

async fn spawn_and_wait(spec: &CommandSpec) -> Result<ExitStatus, BootstrapError> {
    Command::new(spec.program())
        .args(spec.args())
        .status()
        .await
        .map_err(|source| BootstrapError::Spawn {
            program: spec.program().to_string(),
            source,
        })
}

/// Map a child's exit status to the code the sequencer should exit with.
///
/// On Unix, a child killed by signal `n` carries no exit code; the shell
/// convention of `128 + n` is used so supervisors still see the cause.
fn forwarded_exit_code(status: ExitStatus) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    status.code().unwrap_or(1)
}
