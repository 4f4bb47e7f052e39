//! PostgreSQL-backed `RoleStore` implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{RoleStore, StoreError};
use crate::domain::{CallContext, Role, RoleName};
use crate::outbound::deadline::within_deadline;

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::RoleRow;
use super::pool::DbPool;
use super::schema::roles;

#[derive(Clone)]
pub struct DieselRoleStore {
    pool: DbPool,
}

impl DieselRoleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for DieselRoleStore {
    async fn get_by_name(&self, ctx: &CallContext, name: &RoleName) -> Result<Role, StoreError> {
        const OP: &str = "role.get_by_name";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            roles::table
                .filter(roles::name.eq(name.as_str()))
                .select(RoleRow::as_select())
                .first(conn)
                .await
                .optional()
                .map_err(|err| map_diesel_error(err, OP))?
                .ok_or_else(StoreError::not_found)?
                .into_domain()
        })
        .await
    }
}
