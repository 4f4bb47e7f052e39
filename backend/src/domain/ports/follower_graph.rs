//! Port for directed follow edges.
use async_trait::async_trait;

use crate::domain::{AccountId, CallContext};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FollowerGraph: Send + Sync {
    /// Record that `follower` follows `target`.
    ///
    /// An existing edge is [`StoreError::Conflict`]; a missing account is
    /// [`StoreError::NotFound`].
    async fn follow(
        &self,
        ctx: &CallContext,
        follower: AccountId,
        target: AccountId,
    ) -> Result<(), StoreError>;

    /// Remove the edge if present. A missing edge is not an error.
    async fn unfollow(
        &self,
        ctx: &CallContext,
        follower: AccountId,
        target: AccountId,
    ) -> Result<(), StoreError>;
}
