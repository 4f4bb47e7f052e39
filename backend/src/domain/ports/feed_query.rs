//! Port for the personalised feed query.
use async_trait::async_trait;

use crate::domain::{AccountId, CallContext, FeedFilter, FeedItem};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedQuery: Send + Sync {
    /// Posts authored by the viewer or by accounts they follow, filtered,
    /// ordered by creation time, and paginated.
    ///
    /// An empty page is a valid result.
    async fn user_feed(
        &self,
        ctx: &CallContext,
        viewer: AccountId,
        filter: &FeedFilter,
    ) -> Result<Vec<FeedItem>, StoreError>;
}
