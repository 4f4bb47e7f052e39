//! Redis-backed `AccountCache` using a `bb8-redis` pool.
//!
//! Entries are JSON snapshots written with `SET .. EX`, so Redis expires
//! them on its own. There is no invalidation path.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::bb8::{Pool, RunError};
use bb8_redis::redis::{self, RedisError};
use bb8_redis::RedisConnectionManager;
use tracing::debug;

use crate::domain::ports::{AccountCache, StoreError};
use crate::domain::{Account, AccountId, CallContext};
use crate::outbound::deadline::within_deadline;

use super::snapshot::{account_cache_key, decode, encode};

/// Default snapshot lifetime.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60);

/// Errors raised while building the cache pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedisCacheError {
    #[error("failed to build redis pool: {message}")]
    Build { message: String },
}

/// Redis implementation of the `AccountCache` port.
#[derive(Clone)]
pub struct RedisAccountCache {
    pool: Pool<RedisConnectionManager>,
    ttl: Duration,
    call_timeout: Duration,
}

impl RedisAccountCache {
    /// Wrap an existing pool.
    pub fn new(pool: Pool<RedisConnectionManager>, ttl: Duration) -> Self {
        Self {
            pool,
            ttl,
            call_timeout: Duration::from_secs(5),
        }
    }

    /// Build a pool for `redis_url` and wrap it.
    ///
    /// # Errors
    ///
    /// Returns [`RedisCacheError::Build`] for an invalid URL or when the
    /// initial connection fails.
    pub async fn connect(redis_url: &str, ttl: Duration) -> Result<Self, RedisCacheError> {
        let manager = RedisConnectionManager::new(redis_url).map_err(|err| {
            RedisCacheError::Build {
                message: err.to_string(),
            }
        })?;
        let pool = Pool::builder()
            .build(manager)
            .await
            .map_err(|err| RedisCacheError::Build {
                message: err.to_string(),
            })?;
        Ok(Self::new(pool, ttl))
    }

    /// Upper bound for a single cache round trip.
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

fn map_run_error(error: RunError<RedisError>) -> StoreError {
    match error {
        RunError::TimedOut => StoreError::timeout(),
        RunError::User(err) => map_redis_error(err),
    }
}

fn map_redis_error(error: RedisError) -> StoreError {
    debug!(kind = ?error.kind(), "redis operation failed");
    if error.is_timeout() {
        StoreError::timeout()
    } else {
        StoreError::internal(format!("account cache backend failure: {error}"))
    }
}

#[async_trait]
impl AccountCache for RedisAccountCache {
    async fn get(&self, ctx: &CallContext, id: AccountId) -> Result<Option<Account>, StoreError> {
        const OP: &str = "cache.get";
        within_deadline(ctx, self.call_timeout, OP, async {
            let mut conn = self.pool.get().await.map_err(map_run_error)?;
            let raw: Option<String> = redis::cmd("GET")
                .arg(account_cache_key(id))
                .query_async(&mut *conn)
                .await
                .map_err(map_redis_error)?;
            raw.as_deref().map(decode).transpose()
        })
        .await
    }

    async fn set(&self, ctx: &CallContext, account: &Account) -> Result<(), StoreError> {
        const OP: &str = "cache.set";
        if account.id().is_unset() {
            return Err(StoreError::invalid_entity("account id must be set"));
        }
        let payload = encode(account)?;
        within_deadline(ctx, self.call_timeout, OP, async {
            let mut conn = self.pool.get().await.map_err(map_run_error)?;
            let () = redis::cmd("SET")
                .arg(account_cache_key(account.id()))
                .arg(payload)
                .arg("EX")
                .arg(self.ttl_secs())
                .query_async(&mut *conn)
                .await
                .map_err(map_redis_error)?;
            Ok(())
        })
        .await
    }
}
