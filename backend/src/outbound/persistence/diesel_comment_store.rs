//! PostgreSQL-backed `CommentStore` implementation.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::domain::ports::{CommentStore, StoreError};
use crate::domain::{CallContext, Comment, CommentWithAuthor, NewComment, PostId};
use crate::outbound::deadline::within_deadline;

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{CommentRow, NewCommentRow};
use super::pool::DbPool;
use super::schema::{accounts, comments};

#[derive(Clone)]
pub struct DieselCommentStore {
    pool: DbPool,
}

impl DieselCommentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CommentStore for DieselCommentStore {
    async fn create(
        &self,
        ctx: &CallContext,
        comment: &NewComment,
    ) -> Result<Comment, StoreError> {
        const OP: &str = "comment.create";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let row: CommentRow = diesel::insert_into(comments::table)
                .values(&NewCommentRow {
                    post_id: comment.post_id.get(),
                    author_id: comment.author_id.get(),
                    content: &comment.content,
                })
                .returning(CommentRow::as_returning())
                .get_result(conn)
                .await
                .map_err(|err| map_diesel_error(err, OP))?;
            Ok(row.into())
        })
        .await
    }

    async fn list_by_post(
        &self,
        ctx: &CallContext,
        post: PostId,
    ) -> Result<Vec<CommentWithAuthor>, StoreError> {
        const OP: &str = "comment.list_by_post";
        within_deadline(ctx, self.pool.query_timeout(), OP, async {
            let mut pooled = self.pool.get().await.map_err(map_pool_error)?;
            let conn: &mut AsyncPgConnection = &mut pooled;
            let rows: Vec<(CommentRow, String)> = comments::table
                .inner_join(accounts::table)
                .filter(comments::post_id.eq(post.get()))
                .order_by((comments::created_at.desc(), comments::id.desc()))
                .select((CommentRow::as_select(), accounts::username))
                .load(conn)
                .await
                .map_err(|err| map_diesel_error(err, OP))?;
            Ok(rows
                .into_iter()
                .map(|(row, author_username)| CommentWithAuthor {
                    comment: row.into(),
                    author_username,
                })
                .collect())
        })
        .await
    }
}
