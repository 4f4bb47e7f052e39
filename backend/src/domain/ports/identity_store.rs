//! Port for account persistence and the invitation lifecycle.
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{Account, AccountId, CallContext, Email, InvitationToken, NewAccount};

use super::StoreError;

/// Account CRUD plus the transactional invite and activate workflows.
///
/// Read operations only return active accounts; an inactive account is
/// reported as [`StoreError::NotFound`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Insert an account, resolving its role name to a role row.
    ///
    /// Duplicate email or username surface as [`StoreError::DuplicateEmail`]
    /// and [`StoreError::DuplicateUsername`]; an unknown role is
    /// [`StoreError::InvalidEntity`].
    async fn create(&self, ctx: &CallContext, account: &NewAccount)
    -> Result<Account, StoreError>;

    /// Create an inactive account and its invitation in one transaction.
    ///
    /// Only the hash of `token` is persisted, expiring `ttl` from now.
    /// Either both rows exist afterwards or neither does.
    async fn create_and_invite(
        &self,
        ctx: &CallContext,
        account: &NewAccount,
        token: &InvitationToken,
        ttl: Duration,
    ) -> Result<Account, StoreError>;

    /// Activate the account owning an unexpired invitation matching `token`
    /// and consume every invitation for that account.
    ///
    /// An unknown, expired, or already-consumed token is
    /// [`StoreError::TokenNotFoundOrExpired`].
    async fn activate(
        &self,
        ctx: &CallContext,
        token: &InvitationToken,
    ) -> Result<AccountId, StoreError>;

    /// Remove an account and its invitations. Deleting a missing account
    /// succeeds.
    async fn delete(&self, ctx: &CallContext, id: AccountId) -> Result<(), StoreError>;

    /// Fetch an active account by id, joined with its role.
    async fn get_by_id(&self, ctx: &CallContext, id: AccountId) -> Result<Account, StoreError>;

    /// Fetch an active account by email, including its stored credential.
    async fn get_by_email(&self, ctx: &CallContext, email: &Email)
    -> Result<Account, StoreError>;
}
