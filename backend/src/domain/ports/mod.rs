//! Capability ports for the storage core.
//!
//! Each port is a narrow async contract so callers depend only on the
//! capability they use and tests can substitute in-memory fakes.

mod macros;
pub(crate) use macros::define_port_error;

mod account_cache;
mod comment_store;
mod feed_query;
mod follower_graph;
mod identity_store;
mod post_store;
mod role_store;
mod store_error;

#[cfg(test)]
pub use account_cache::MockAccountCache;
pub use account_cache::AccountCache;
#[cfg(test)]
pub use comment_store::MockCommentStore;
pub use comment_store::CommentStore;
#[cfg(test)]
pub use feed_query::MockFeedQuery;
pub use feed_query::FeedQuery;
#[cfg(test)]
pub use follower_graph::MockFollowerGraph;
pub use follower_graph::FollowerGraph;
#[cfg(test)]
pub use identity_store::MockIdentityStore;
pub use identity_store::IdentityStore;
#[cfg(test)]
pub use post_store::MockPostStore;
pub use post_store::PostStore;
#[cfg(test)]
pub use role_store::MockRoleStore;
pub use role_store::RoleStore;
pub use store_error::StoreError;
