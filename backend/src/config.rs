//! Storage configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `SOCIAL_STORE_*` environment variables, or a
//! config file. Every tunable has a default; only the database URL must be
//! supplied before connecting.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_MAX_CONNECTIONS: u32 = 30;
const DEFAULT_MAX_IDLE_SECS: u64 = 15 * 60;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 5;
const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 60;

/// Connection and cache settings for the storage core.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SOCIAL_STORE")]
pub struct StorageSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Maximum open connections in the pool.
    pub max_connections: Option<u32>,
    /// Seconds a pooled connection may sit idle before it is closed.
    pub max_idle_secs: Option<u64>,
    /// Seconds to wait for a pooled connection.
    pub connection_timeout_secs: Option<u64>,
    /// Per-call budget in seconds for every store and cache operation.
    pub query_timeout_secs: Option<u64>,
    /// Redis URL for the account cache.
    pub redis_url: Option<String>,
    /// Lifetime of cached account snapshots, in seconds.
    pub cache_ttl_secs: Option<u64>,
    /// Put the Redis account cache in front of id lookups.
    #[ortho_config(default = false)]
    pub cache_enabled: bool,
}

impl StorageSettings {
    /// Return the configured database URL, if any.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS)
    }

    pub fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs.unwrap_or(DEFAULT_MAX_IDLE_SECS))
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connection_timeout_secs
                .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS),
        )
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs.unwrap_or(DEFAULT_QUERY_TIMEOUT_SECS))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(DEFAULT_CACHE_TTL_SECS))
    }

    /// Redis URL when the cache is enabled and configured.
    pub fn cache_url(&self) -> Option<&str> {
        if self.cache_enabled {
            self.redis_url.as_deref()
        } else {
            None
        }
    }
}
