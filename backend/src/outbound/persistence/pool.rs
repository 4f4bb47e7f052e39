//! bb8 pool of `diesel-async` PostgreSQL connections.
//!
//! Open connections are capped at `max_size`. Connections idle past
//! `idle_timeout` are closed, and a checkout that cannot be served within
//! `connection_timeout` fails with [`PoolError::Timeout`]. The pool also
//! carries the per-call `query_timeout` every adapter applies.

use std::time::Duration;

use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection, RunError};

use crate::domain::ports::define_port_error;

const DEFAULT_MAX_SIZE: u32 = 30;
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);
const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

define_port_error! {
    /// Pool construction and checkout failures.
    pub enum PoolError {
        /// Opening or validating a connection failed.
        Checkout { message: String } => "connection checkout failed: {message}",
        /// The checkout timeout elapsed with every connection busy.
        Timeout => "timed out waiting for a pooled connection",
        /// The pool could not be built from its configuration.
        Build { message: String } => "connection pool build failed: {message}",
    }
}

/// Pool sizing and timeouts.
///
/// ```ignore
/// let config = PoolConfig::new("postgres://social@localhost/social")
///     .with_max_size(30)
///     .with_idle_timeout(Some(Duration::from_secs(900)))
///     .with_query_timeout(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfig {
    database_url: String,
    max_size: u32,
    min_idle: Option<u32>,
    idle_timeout: Option<Duration>,
    connection_timeout: Duration,
    query_timeout: Duration,
}

impl PoolConfig {
    /// 30 connections, no idle floor, 15 minute idle lifetime, 5 second
    /// checkout and query budgets.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_size: DEFAULT_MAX_SIZE,
            min_idle: None,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Keep at least `min_idle` connections open.
    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// Close connections idle longer than this; `None` keeps them forever.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Longest wait for a free connection.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Upper bound for a single adapter call, checkout included.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Shared handle to the connection pool. Clones share one pool.
#[derive(Clone)]
pub struct DbPool {
    inner: Pool<AsyncPgConnection>,
    query_timeout: Duration,
}

impl DbPool {
    /// Build the pool described by `config`.
    ///
    /// # Errors
    ///
    /// [`PoolError::Build`] when bb8 rejects the configuration or the
    /// initial connections cannot be opened.
    pub async fn new(config: PoolConfig) -> Result<Self, PoolError> {
        let PoolConfig {
            database_url,
            max_size,
            min_idle,
            idle_timeout,
            connection_timeout,
            query_timeout,
        } = config;
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

        let inner = Pool::builder()
            .max_size(max_size)
            .min_idle(min_idle)
            .idle_timeout(idle_timeout)
            .connection_timeout(connection_timeout)
            .build(manager)
            .await
            .map_err(|err| PoolError::build(err.to_string()))?;

        Ok(Self {
            inner,
            query_timeout,
        })
    }

    /// Check out a connection.
    ///
    /// # Errors
    ///
    /// [`PoolError::Timeout`] when the checkout timeout elapses, otherwise
    /// [`PoolError::Checkout`] with the driver's message.
    pub async fn get(&self) -> Result<PooledConnection<'_, AsyncPgConnection>, PoolError> {
        self.inner.get().await.map_err(|err| match err {
            RunError::TimedOut => PoolError::Timeout,
            RunError::User(cause) => PoolError::checkout(cause.to_string()),
        })
    }

    /// Per-call budget applied by the adapters sharing this pool.
    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const URL: &str = "postgres://social@localhost/social";

    #[rstest]
    fn new_config_matches_deployment_defaults() {
        let config = PoolConfig::new(URL);

        assert_eq!(config.database_url(), URL);
        assert_eq!(config.max_size, 30);
        assert!(config.min_idle.is_none());
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(900)));
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.query_timeout, Duration::from_secs(5));
    }

    #[rstest]
    fn builders_override_each_setting() {
        let config = PoolConfig::new(URL)
            .with_max_size(8)
            .with_min_idle(Some(2))
            .with_idle_timeout(None)
            .with_connection_timeout(Duration::from_secs(1))
            .with_query_timeout(Duration::from_millis(250));

        assert_eq!(config.max_size, 8);
        assert_eq!(config.min_idle, Some(2));
        assert!(config.idle_timeout.is_none());
        assert_eq!(config.connection_timeout, Duration::from_secs(1));
        assert_eq!(config.query_timeout, Duration::from_millis(250));
    }

    #[rstest]
    #[case(PoolError::checkout("connection refused"), "connection refused")]
    #[case(PoolError::build("invalid URL"), "invalid URL")]
    #[case(PoolError::timeout(), "timed out")]
    fn errors_render_their_cause(#[case] err: PoolError, #[case] fragment: &str) {
        assert!(err.to_string().contains(fragment));
    }
}
