//! Port for post persistence.
use async_trait::async_trait;

use crate::domain::{CallContext, NewPost, Post, PostId};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create(&self, ctx: &CallContext, post: &NewPost) -> Result<Post, StoreError>;

    async fn get_by_id(&self, ctx: &CallContext, id: PostId) -> Result<Post, StoreError>;

    /// Apply `post`'s title, content, and tags if its version is current.
    ///
    /// Returns the stored post with its incremented version. A stale version
    /// is [`StoreError::Conflict`]; a missing post is [`StoreError::NotFound`].
    async fn update(&self, ctx: &CallContext, post: &Post) -> Result<Post, StoreError>;

    async fn delete(&self, ctx: &CallContext, id: PostId) -> Result<(), StoreError>;
}
