//! Database readiness gating.
//!
//! The server must not start before PostgreSQL accepts connections, so the
//! sequencer probes the configured endpoint with a TCP connect-and-close
//! until it succeeds or an overall deadline passes. The probe checks
//! reachability only; no protocol-level handshake or query is performed.
//!
//! The wait loop itself is generic over the probe so its timing contract
//! (fixed interval between attempts, hard overall deadline) can be tested
//! without a live listener.
//!
//! # Example
//!
//! ```ignore
//! use competitions_bootstrap::{config::BootstrapConfig, wait::wait_for_database};
//!
//! let config = BootstrapConfig::from_env()?;
//! let waited = wait_for_database(&config).await?;
//! tracing::info!(?waited, "database is ready");
//! ```

use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use crate::config::BootstrapConfig;
use crate::error::BootstrapError;

/// Timing contract for [`wait_until_ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Overall deadline before giving up.
    pub deadline: Duration,
    /// Delay between consecutive failed probes.
    pub interval: Duration,
}

impl From<&BootstrapConfig> for WaitPolicy {
    fn from(config: &BootstrapConfig) -> Self {
        Self {
            deadline: config.wait_timeout,
            interval: config.retry_interval,
        }
    }
}

/// Why a single connection probe failed.
#[derive(Debug, Error)]
enum ProbeError {
    /// The connection attempt completed with a socket error.
    #[error("{0}")]
    Connect(std::io::Error),

    /// The connection attempt did not complete in time.
    #[error("connection attempt timed out after {0:?}")]
    AttemptTimedOut(Duration),
}

/// Run `probe` until it succeeds, sleeping `policy.interval` between
/// failures, for at most `policy.deadline`.
///
/// The deadline is checked before each attempt, so the loop gives up after
/// approximately `deadline` (at most one interval plus one attempt late).
/// Probe failures are logged and retried indefinitely within the deadline;
/// there is no failure that aborts the loop early.
///
/// Returns the total time waited on success, or the total elapsed time when
/// the deadline passed.
///
/// # Errors
///
/// `Err(elapsed)` when the deadline passed without a successful probe.
pub async fn wait_until_ready<F, Fut, E>(
    policy: WaitPolicy,
    mut probe: F,
) -> Result<Duration, Duration>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    let started = Instant::now();
    let mut attempt: u32 = 0;

    loop {
        let elapsed = started.elapsed();
        if elapsed >= policy.deadline {
            return Err(elapsed);
        }

        attempt += 1;
        match probe().await {
            Ok(()) => {
                let waited = started.elapsed();
                if attempt > 1 {
                    info!(attempt, waited_ms = waited.as_millis(), "probe succeeded after retry");
                }
                return Ok(waited);
            }
            Err(err) => {
                warn!(attempt, error = %err, "dependency not ready, retrying");
                sleep(policy.interval).await;
            }
        }
    }
}

/// Single TCP connect-and-close probe against `address`.
async fn probe_tcp(address: &str, connect_timeout: Duration) -> Result<(), ProbeError> {
    match timeout(connect_timeout, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => {
            // Reachability confirmed; the connection itself is not wanted.
            drop(stream);
            Ok(())
        }
        Ok(Err(err)) => Err(ProbeError::Connect(err)),
        Err(_) => Err(ProbeError::AttemptTimedOut(connect_timeout)),
    }
}

/// Block until the configured database endpoint accepts a TCP connection.
///
/// Returns the total time spent waiting.
///
/// # Errors
///
/// [`BootstrapError::DependencyUnavailable`] if the deadline passes before
/// the endpoint accepts a connection.
pub async fn wait_for_database(config: &BootstrapConfig) -> Result<Duration, BootstrapError> {
    let address = config.address();
    info!(
        host = %config.host,
        port = config.port,
        deadline_secs = config.wait_timeout.as_secs(),
        "waiting for database"
    );

    let connect_timeout = config.connect_timeout;
    match wait_until_ready(WaitPolicy::from(config), || {
        probe_tcp(&address, connect_timeout)
    })
    .await
    {
        Ok(waited) => {
            info!(waited_ms = waited.as_millis(), "database reachable");
            Ok(waited)
        }
        Err(waited) => Err(BootstrapError::DependencyUnavailable {
            host: config.host.clone(),
            port: config.port,
            waited,
        }),
    }
}
