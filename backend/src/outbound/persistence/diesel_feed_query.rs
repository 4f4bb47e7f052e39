//! PostgreSQL-backed `FeedQuery` implementation.
//!
//! The Diesel DSL cannot express the optional predicate set without boxing
//! every combination, so the query is composed by [`FeedQueryPlan`] and run
//! as a boxed raw query with typed binds.

use async_trait::async_trait;
use diesel::pg::Pg;
use diesel::sql_types::{Array, Int8, Text, Timestamptz};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::debug;

use crate::domain::ports::{FeedQuery, StoreError};
use crate::domain::{AccountId, CallContext, FeedFilter, FeedItem};
use crate::outbound::deadline::within_deadline;

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::feed_sql::{FeedBind, FeedQueryPlan};
use super::models::FeedRow;
use super::pool::DbPool;

/// Diesel-backed implementation of the `FeedQuery` port.
#[derive(Clone)]
pub struct DieselFeedQuery {
    pool: DbPool,
}

impl DieselFeedQuery {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedQuery for DieselFeedQuery {
    async fn user_feed(
        &self,
        ctx: &CallContext,
        viewer: AccountId,
        filter: &FeedFilter,
    ) -> Result<Vec<FeedItem>, StoreError> {
        const OP: &str = "feed.user_feed";
        let plan = FeedQueryPlan::compose(viewer, filter);
        within_deadline(ctx, self.pool.query_timeout(), OP, async move {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;

            let mut query = diesel::sql_query(plan.sql().to_owned()).into_boxed::<Pg>();
            for bind in plan.into_binds() {
                query = match bind {
                    FeedBind::BigInt(value) => query.bind::<Int8, _>(value),
                    FeedBind::Text(value) => query.bind::<Text, _>(value),
                    FeedBind::TextArray(value) => query.bind::<Array<Text>, _>(value),
                    FeedBind::Timestamp(value) => query.bind::<Timestamptz, _>(value),
                };
            }

            let rows: Vec<FeedRow> = query
                .load(conn)
                .await
                .map_err(|err| map_diesel_error(err, OP))?;
            debug!(viewer = viewer.get(), rows = rows.len(), "feed page loaded");
            Ok(rows.into_iter().map(FeedItem::from).collect())
        })
        .await
    }
}
