//! PostgreSQL-backed `PostStore` implementation.
//!
//! Updates use optimistic concurrency: the `UPDATE` matches on both id and
//! the caller's version. When nothing matches, a follow-up existence check
//! tells a stale version apart from a missing post.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{PostStore, StoreError};
use crate::domain::{CallContext, NewPost, Post, PostId};
use crate::outbound::deadline::within_deadline;

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{NewPostRow, PostRow};
use super::pool::DbPool;
use super::schema::posts;

#[derive(Clone)]
pub struct DieselPostStore {
    pool: DbPool,
}

impl DieselPostStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostStore for DieselPostStore {
    async fn create(&self, ctx: &CallContext, post: &NewPost) -> Result<Post, StoreError> {
        const OP: &str = "post.create";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let row: PostRow = diesel::insert_into(posts::table)
                .values(&NewPostRow {
                    author_id: post.author_id.get(),
                    title: &post.title,
                    content: &post.content,
                    tags: &post.tags,
                })
                .returning(PostRow::as_returning())
                .get_result(conn)
                .await
                .map_err(|err| map_diesel_error(err, OP))?;
            Ok(row.into())
        })
        .await
    }

    async fn get_by_id(&self, ctx: &CallContext, id: PostId) -> Result<Post, StoreError> {
        const OP: &str = "post.get_by_id";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            posts::table
                .find(id.get())
                .select(PostRow::as_select())
                .first(conn)
                .await
                .optional()
                .map_err(|err| map_diesel_error(err, OP))?
                .map(Post::from)
                .ok_or_else(StoreError::not_found)
        })
        .await
    }

    async fn update(&self, ctx: &CallContext, post: &Post) -> Result<Post, StoreError> {
        const OP: &str = "post.update";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let updated: Option<PostRow> = diesel::update(
                posts::table
                    .filter(posts::id.eq(post.id.get()))
                    .filter(posts::version.eq(post.version)),
            )
            .set((
                posts::title.eq(&post.title),
                posts::content.eq(&post.content),
                posts::tags.eq(&post.tags),
                posts::updated_at.eq(Utc::now()),
                posts::version.eq(posts::version + 1),
            ))
            .returning(PostRow::as_returning())
            .get_result(conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, OP))?;

            if let Some(row) = updated {
                return Ok(row.into());
            }

            let current: Option<i32> = posts::table
                .find(post.id.get())
                .select(posts::version)
                .first(conn)
                .await
                .optional()
                .map_err(|err| map_diesel_error(err, OP))?;
            Err(match current {
                Some(version) => StoreError::conflict(format!(
                    "post version is {version}, update expected {}",
                    post.version
                )),
                None => StoreError::not_found(),
            })
        })
        .await
    }

    async fn delete(&self, ctx: &CallContext, id: PostId) -> Result<(), StoreError> {
        const OP: &str = "post.delete";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let deleted = diesel::delete(posts::table.find(id.get()))
                .execute(conn)
                .await
                .map_err(|err| map_diesel_error(err, OP))?;
            if deleted == 0 {
                return Err(StoreError::not_found());
            }
            Ok(())
        })
        .await
    }
}
