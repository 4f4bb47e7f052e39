//! Outbound adapters implementing the storage ports.
//!
//! - **persistence**: PostgreSQL-backed stores using Diesel
//! - **cache**: Redis-backed account snapshots
//!
//! Adapters are thin translators between domain types and infrastructure
//! representations. [`connect_storage`] wires them into a
//! [`Storage`](crate::domain::Storage) from [`StorageSettings`].

pub mod cache;
mod deadline;
pub mod persistence;

use std::sync::Arc;

use tracing::info;

use crate::config::StorageSettings;
use crate::domain::{Storage, StoragePorts};

use cache::{RedisAccountCache, RedisCacheError};
use persistence::{
    DbPool, DieselCommentStore, DieselFeedQuery, DieselFollowerGraph, DieselIdentityStore,
    DieselPostStore, DieselRoleStore, PoolConfig, PoolError,
};

/// Failures while wiring the storage facade.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageInitError {
    #[error("database url is not configured")]
    MissingDatabaseUrl,
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Cache(#[from] RedisCacheError),
}

/// Pool configuration derived from settings.
///
/// # Errors
///
/// Returns [`StorageInitError::MissingDatabaseUrl`] when no URL is set.
pub fn pool_config(settings: &StorageSettings) -> Result<PoolConfig, StorageInitError> {
    let url = settings
        .database_url()
        .ok_or(StorageInitError::MissingDatabaseUrl)?;
    Ok(PoolConfig::new(url)
        .with_max_size(settings.max_connections())
        .with_idle_timeout(Some(settings.max_idle()))
        .with_connection_timeout(settings.connection_timeout())
        .with_query_timeout(settings.query_timeout()))
}

/// Build every PostgreSQL adapter over one shared pool.
pub fn diesel_storage(pool: &DbPool) -> Storage {
    Storage::new(StoragePorts {
        identity: Arc::new(DieselIdentityStore::new(pool.clone())),
        feed: Arc::new(DieselFeedQuery::new(pool.clone())),
        follows: Arc::new(DieselFollowerGraph::new(pool.clone())),
        posts: Arc::new(DieselPostStore::new(pool.clone())),
        comments: Arc::new(DieselCommentStore::new(pool.clone())),
        roles: Arc::new(DieselRoleStore::new(pool.clone())),
    })
}

/// Connect the pool, and the cache when enabled, and assemble the facade.
///
/// # Errors
///
/// Propagates missing configuration, pool build, and cache build failures.
pub async fn connect_storage(settings: &StorageSettings) -> Result<Storage, StorageInitError> {
    let pool = DbPool::new(pool_config(settings)?).await?;
    let storage = diesel_storage(&pool);

    let Some(redis_url) = settings.cache_url() else {
        info!("storage connected without account cache");
        return Ok(storage);
    };
    let cache = RedisAccountCache::connect(redis_url, settings.cache_ttl())
        .await?
        .with_call_timeout(settings.query_timeout());
    info!(
        ttl_secs = settings.cache_ttl().as_secs(),
        "storage connected with account cache"
    );
    Ok(storage.with_account_cache(Arc::new(cache)))
}
