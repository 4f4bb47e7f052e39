//! PostgreSQL-backed `IdentityStore` implementation using Diesel ORM.
//!
//! Invite, activate, and delete each run as one transaction. Diesel-async
//! rolls back on every error return, so a failed step never leaves partial
//! writes behind. Activation locks the matching invitation row, which
//! serialises concurrent attempts with the same token: the loser sees the
//! row gone and reports the token as unknown.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::info;

use crate::domain::ports::{IdentityStore, StoreError};
use crate::domain::{Account, AccountId, CallContext, Email, InvitationToken, NewAccount};
use crate::outbound::deadline::within_deadline;

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{AccountRow, NewAccountRow, NewInvitationRow, RoleRow};
use super::pool::DbPool;
use super::schema::{accounts, invitation_tokens, roles};
use super::transaction::WorkflowError;

/// Diesel-backed implementation of the `IdentityStore` port.
#[derive(Clone)]
pub struct DieselIdentityStore {
    pool: DbPool,
}

impl DieselIdentityStore {
    /// Create a new store with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Resolve the role and insert the account row.
async fn insert_account(
    conn: &mut AsyncPgConnection,
    account: &NewAccount,
    active: bool,
) -> Result<Account, WorkflowError> {
    let role: RoleRow = roles::table
        .filter(roles::name.eq(account.role().as_str()))
        .select(RoleRow::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| StoreError::invalid_entity(format!("unknown role `{}`", account.role())))?;

    let row: AccountRow = diesel::insert_into(accounts::table)
        .values(&NewAccountRow {
            username: account.username().as_str(),
            email: account.email().as_str(),
            password_hash: account.credential().as_phc(),
            is_active: active,
            role_id: role.id,
        })
        .returning(AccountRow::as_returning())
        .get_result(conn)
        .await?;

    Ok(row.into_domain(role, false)?)
}

fn invitation_expiry(ttl: Duration) -> Result<DateTime<Utc>, StoreError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| StoreError::invalid_entity("invitation ttl out of range"))
}

#[async_trait]
impl IdentityStore for DieselIdentityStore {
    async fn create(
        &self,
        ctx: &CallContext,
        account: &NewAccount,
    ) -> Result<Account, StoreError> {
        const OP: &str = "identity.create";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            conn.transaction::<_, WorkflowError, _>(|conn| {
                async move { insert_account(conn, account, account.is_active()).await }
                    .scope_boxed()
            })
            .await
            .map_err(|err| err.into_store(OP))
        })
        .await
    }

    async fn create_and_invite(
        &self,
        ctx: &CallContext,
        account: &NewAccount,
        token: &InvitationToken,
        ttl: Duration,
    ) -> Result<Account, StoreError> {
        const OP: &str = "identity.create_and_invite";
        let expiry = invitation_expiry(ttl)?;
        let token_hash = token.hash();
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let created = conn
                .transaction::<_, WorkflowError, _>(|conn| {
                    async move {
                        let created = insert_account(conn, account, false).await?;
                        diesel::insert_into(invitation_tokens::table)
                            .values(&NewInvitationRow {
                                token_hash: token_hash.as_str(),
                                account_id: created.id().get(),
                                expiry,
                            })
                            .execute(conn)
                            .await?;
                        Ok(created)
                    }
                    .scope_boxed()
                })
                .await
                .map_err(|err| err.into_store(OP))?;
            info!(account_id = created.id().get(), "account invited");
            Ok(created)
        })
        .await
    }

    async fn activate(
        &self,
        ctx: &CallContext,
        token: &InvitationToken,
    ) -> Result<AccountId, StoreError> {
        const OP: &str = "identity.activate";
        let token_hash = token.hash();
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let now = Utc::now();
            let account_id = conn
                .transaction::<_, WorkflowError, _>(|conn| {
                    async move {
                        let account_id: i64 = invitation_tokens::table
                            .filter(invitation_tokens::token_hash.eq(token_hash.as_str()))
                            .filter(invitation_tokens::expiry.gt(now))
                            .select(invitation_tokens::account_id)
                            .for_update()
                            .first(conn)
                            .await
                            .optional()?
                            .ok_or(StoreError::TokenNotFoundOrExpired)?;

                        diesel::update(accounts::table.find(account_id))
                            .set(accounts::is_active.eq(true))
                            .execute(conn)
                            .await?;

                        diesel::delete(
                            invitation_tokens::table
                                .filter(invitation_tokens::account_id.eq(account_id)),
                        )
                        .execute(conn)
                        .await?;

                        Ok(AccountId::new(account_id))
                    }
                    .scope_boxed()
                })
                .await
                .map_err(|err| err.into_store(OP))?;
            info!(account_id = account_id.get(), "account activated");
            Ok(account_id)
        })
        .await
    }

    async fn delete(&self, ctx: &CallContext, id: AccountId) -> Result<(), StoreError> {
        const OP: &str = "identity.delete";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                async move {
                    diesel::delete(
                        invitation_tokens::table.filter(invitation_tokens::account_id.eq(id.get())),
                    )
                    .execute(conn)
                    .await?;
                    diesel::delete(accounts::table.find(id.get()))
                        .execute(conn)
                        .await?;
                    Ok(())
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, OP))?;
            info!(account_id = id.get(), "account deleted");
            Ok(())
        })
        .await
    }

    async fn get_by_id(&self, ctx: &CallContext, id: AccountId) -> Result<Account, StoreError> {
        const OP: &str = "identity.get_by_id";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let (account, role) = accounts::table
                .inner_join(roles::table)
                .filter(accounts::id.eq(id.get()))
                .filter(accounts::is_active.eq(true))
                .select((AccountRow::as_select(), RoleRow::as_select()))
                .first::<(AccountRow, RoleRow)>(conn)
                .await
                .optional()
                .map_err(|err| map_diesel_error(err, OP))?
                .ok_or_else(StoreError::not_found)?;
            account.into_domain(role, false)
        })
        .await
    }

    async fn get_by_email(
        &self,
        ctx: &CallContext,
        email: &Email,
    ) -> Result<Account, StoreError> {
        const OP: &str = "identity.get_by_email";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let (account, role) = accounts::table
                .inner_join(roles::table)
                .filter(accounts::email.eq(email.as_str()))
                .filter(accounts::is_active.eq(true))
                .select((AccountRow::as_select(), RoleRow::as_select()))
                .first::<(AccountRow, RoleRow)>(conn)
                .await
                .optional()
                .map_err(|err| map_diesel_error(err, OP))?
                .ok_or_else(StoreError::not_found)?;
            account.into_domain(role, true)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn expiry_lies_in_the_future() {
        let expiry = invitation_expiry(Duration::from_secs(72 * 3600)).expect("in range");
        assert!(expiry > Utc::now() + chrono::Duration::hours(71));
    }

    #[rstest]
    fn unrepresentable_ttl_is_rejected() {
        let result = invitation_expiry(Duration::MAX);
        assert!(matches!(result, Err(StoreError::InvalidEntity { .. })));
    }
}
