//! Cache adapters for hot identity reads.

mod redis_account_cache;
pub(crate) mod snapshot;

pub use redis_account_cache::{DEFAULT_CACHE_TTL, RedisAccountCache, RedisCacheError};
