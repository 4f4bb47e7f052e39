//! PostgreSQL-backed `FollowerGraph` implementation.
//!
//! Uniqueness comes from the `follow_edges` primary key; a repeated follow
//! surfaces as a conflict instead of being silently ignored.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{FollowerGraph, StoreError};
use crate::domain::{AccountId, CallContext, FollowEdge};
use crate::outbound::deadline::within_deadline;

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::NewFollowEdgeRow;
use super::pool::DbPool;
use super::schema::follow_edges;

/// Diesel-backed implementation of the `FollowerGraph` port.
#[derive(Clone)]
pub struct DieselFollowerGraph {
    pool: DbPool,
}

impl DieselFollowerGraph {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FollowerGraph for DieselFollowerGraph {
    async fn follow(
        &self,
        ctx: &CallContext,
        follower: AccountId,
        target: AccountId,
    ) -> Result<(), StoreError> {
        const OP: &str = "follow.follow";
        let edge = FollowEdge::new(follower, target);
        if edge.is_self_follow() {
            debug!(account_id = follower.get(), "recording self-follow");
        }
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            diesel::insert_into(follow_edges::table)
                .values(&NewFollowEdgeRow {
                    follower_id: edge.follower.get(),
                    followed_id: edge.followed.get(),
                })
                .execute(conn)
                .await
                .map_err(|err| map_diesel_error(err, OP))?;
            Ok(())
        })
        .await
    }

    async fn unfollow(
        &self,
        ctx: &CallContext,
        follower: AccountId,
        target: AccountId,
    ) -> Result<(), StoreError> {
        const OP: &str = "follow.unfollow";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            // A missing edge is success; the row count is not checked.
            diesel::delete(
                follow_edges::table
                    .filter(follow_edges::follower_id.eq(follower.get()))
                    .filter(follow_edges::followed_id.eq(target.get())),
            )
            .execute(conn)
            .await
            .map_err(|err| map_diesel_error(err, OP))?;
            Ok(())
        })
        .await
    }
}
