//! Port for comment persistence.
use async_trait::async_trait;

use crate::domain::{CallContext, Comment, CommentWithAuthor, NewComment, PostId};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn create(&self, ctx: &CallContext, comment: &NewComment)
    -> Result<Comment, StoreError>;

    /// Comments on a post, newest first.
    async fn list_by_post(
        &self,
        ctx: &CallContext,
        post: PostId,
    ) -> Result<Vec<CommentWithAuthor>, StoreError>;
}
