//! Bootstrap configuration.
//!
//! Configuration values come from the environment with conventional
//! defaults; nothing at this layer is hardcoded at the call site. The
//! timing knobs default to the container entrypoint contract: a 120 second
//! overall deadline, a 5 second retry interval, and a 5 second per-attempt
//! connection timeout.

use std::time::Duration;

use crate::error::BootstrapError;

/// Environment variable naming the database host.
pub const ENV_DB_HOST: &str = "POSTGRES_HOST";

/// Environment variable naming the database port.
pub const ENV_DB_PORT: &str = "POSTGRES_PORT";

const DEFAULT_DB_HOST: &str = "db";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for the startup sequence.
///
/// # Example
///
/// ```
/// use competitions_bootstrap::BootstrapConfig;
/// use std::time::Duration;
///
/// let config = BootstrapConfig::default()
///     .with_host("localhost".to_string())
///     .with_retry_interval(Duration::from_millis(250));
///
/// assert_eq!(config.address(), "localhost:5432");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Database host name or address.
    pub host: String,

    /// Database port.
    pub port: u16,

    /// Overall deadline for the database to become reachable.
    pub wait_timeout: Duration,

    /// Delay between consecutive failed connection attempts.
    pub retry_interval: Duration,

    /// Upper bound on a single connection attempt.
    pub connect_timeout: Duration,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl BootstrapConfig {
    /// Build configuration from the process environment.
    ///
    /// Reads [`ENV_DB_HOST`] and [`ENV_DB_PORT`], falling back to the
    /// conventional compose service name `db` and PostgreSQL's port 5432.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Config`] if [`ENV_DB_PORT`] is set but is
    /// not a valid port number.
    pub fn from_env() -> Result<Self, BootstrapError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// [`BootstrapConfig::from_env`] delegates here; tests supply a closure
    /// over a map so they never touch process-global state.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Config`] if the port value does not parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, BootstrapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup(ENV_DB_HOST).unwrap_or_else(|| DEFAULT_DB_HOST.to_string());
        let port = match lookup(ENV_DB_PORT) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                BootstrapError::Config(format!(
                    "{ENV_DB_PORT} must be a port number, got `{raw}`"
                ))
            })?,
            None => DEFAULT_DB_PORT,
        };

        Ok(Self {
            host,
            port,
            ..Self::default()
        })
    }

    /// Set the database host.
    #[must_use]
    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    /// Set the database port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the overall reachability deadline.
    #[must_use]
    pub const fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Set the delay between failed connection attempts.
    #[must_use]
    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    /// Set the per-attempt connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Probe target in `host:port` form.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
