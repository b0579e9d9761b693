//! Error types for the bootstrap sequence.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Failure modes of the startup sequence.
///
/// Every variant is fatal at this layer: the sequencer never retries a
/// failed step and never restarts itself. Restart policy belongs to the
/// external supervisor that launched the process.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The database never accepted a connection within the overall deadline.
    #[error("database at {host}:{port} did not become reachable within {waited:?}")]
    DependencyUnavailable {
        /// Host the probe targeted
        host: String,
        /// Port the probe targeted
        port: u16,
        /// Total time spent waiting
        waited: Duration,
    },

    /// A bootstrap step exited unsuccessfully.
    #[error("step `{step}` failed{}", fmt_status(.status))]
    StepFailed {
        /// Name of the failed step
        step: &'static str,
        /// Exit code, if the process exited normally (`None` means it was
        /// killed by a signal)
        status: Option<i32>,
    },

    /// A command could not be started at all.
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        /// Program that failed to start
        program: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Malformed configuration (environment variable or command string).
    #[error("invalid configuration: {0}")]
    Config(String),
}

fn fmt_status(status: &Option<i32>) -> String {
    status.map_or_else(
        || " (killed by signal)".to_string(),
        |code| format!(" with exit code {code}"),
    )
}

impl BootstrapError {
    /// Process exit code this error maps to.
    ///
    /// Reachability timeouts exit 1. A failed step propagates its own exit
    /// status (1 when the step died to a signal). Configuration errors exit
    /// 2, matching the CLI parser's convention for usage errors.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::DependencyUnavailable { .. } | Self::Spawn { .. } => 1,
            Self::StepFailed { status, .. } => match *status {
                Some(code) => code,
                None => 1,
            },
            Self::Config(_) => 2,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;

    #[test]
    fn step_failure_propagates_its_status() {
        let err = BootstrapError::StepFailed {
            step: "migrate",
            status: Some(3),
        };
        assert_eq!(err.exit_code(), 3);
        assert_eq!(err.to_string(), "step `migrate` failed with exit code 3");
    }

    #[test]
    fn signalled_step_maps_to_one() {
        let err = BootstrapError::StepFailed {
            step: "migrate",
            status: None,
        };
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "step `migrate` failed (killed by signal)");
    }

    #[test]
    fn reachability_timeout_exits_one() {
        let err = BootstrapError::DependencyUnavailable {
            host: "db".to_string(),
            port: 5432,
            waited: Duration::from_secs(120),
        };
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("db:5432"));
    }

    #[test]
    fn config_errors_exit_two() {
        let err = BootstrapError::Config("bad port".to_string());
        assert_eq!(err.exit_code(), 2);
    }
}
