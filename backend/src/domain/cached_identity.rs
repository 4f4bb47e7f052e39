//! Read-through cache decorator for identity lookups.
//!
//! Only [`IdentityStore::get_by_id`] consults the cache. Writes go straight
//! to the inner store and nothing is invalidated, so a cached snapshot may
//! trail the database by up to one cache TTL.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::ports::{AccountCache, IdentityStore, StoreError};
use super::{Account, AccountId, CallContext, Email, InvitationToken, NewAccount};

/// [`IdentityStore`] that fills an [`AccountCache`] on id lookups.
#[derive(Clone)]
pub struct CachedIdentityStore {
    inner: Arc<dyn IdentityStore>,
    cache: Arc<dyn AccountCache>,
}

impl CachedIdentityStore {
    pub fn new(inner: Arc<dyn IdentityStore>, cache: Arc<dyn AccountCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl IdentityStore for CachedIdentityStore {
    async fn create(
        &self,
        ctx: &CallContext,
        account: &NewAccount,
    ) -> Result<Account, StoreError> {
        self.inner.create(ctx, account).await
    }

    async fn create_and_invite(
        &self,
        ctx: &CallContext,
        account: &NewAccount,
        token: &InvitationToken,
        ttl: Duration,
    ) -> Result<Account, StoreError> {
        self.inner.create_and_invite(ctx, account, token, ttl).await
    }

    async fn activate(
        &self,
        ctx: &CallContext,
        token: &InvitationToken,
    ) -> Result<AccountId, StoreError> {
        self.inner.activate(ctx, token).await
    }

    async fn delete(&self, ctx: &CallContext, id: AccountId) -> Result<(), StoreError> {
        self.inner.delete(ctx, id).await
    }

    async fn get_by_id(&self, ctx: &CallContext, id: AccountId) -> Result<Account, StoreError> {
        if let Some(account) = self.cache.get(ctx, id).await? {
            debug!(account_id = id.get(), "account cache hit");
            return Ok(account);
        }
        debug!(account_id = id.get(), "account cache miss");
        let account = self.inner.get_by_id(ctx, id).await?;
        self.cache.set(ctx, &account).await?;
        Ok(account)
    }

    async fn get_by_email(
        &self,
        ctx: &CallContext,
        email: &Email,
    ) -> Result<Account, StoreError> {
        self.inner.get_by_email(ctx, email).await
    }
}
