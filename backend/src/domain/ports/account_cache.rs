//! Port for the cache in front of account lookups.
use async_trait::async_trait;

use crate::domain::{Account, AccountId, CallContext};

use super::StoreError;

/// Non-authoritative account snapshots with a bounded time-to-live.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountCache: Send + Sync {
    /// Read a snapshot. A miss is `Ok(None)`; an undecodable entry is
    /// [`StoreError::Internal`].
    async fn get(&self, ctx: &CallContext, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Store a snapshot under the account id, overwriting any existing one.
    ///
    /// An unset id is [`StoreError::InvalidEntity`].
    async fn set(&self, ctx: &CallContext, account: &Account) -> Result<(), StoreError>;
}
