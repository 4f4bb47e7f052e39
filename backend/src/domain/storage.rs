//! Composition root exposing every storage capability.

use std::sync::Arc;

use super::cached_identity::CachedIdentityStore;
use super::ports::{
    AccountCache, CommentStore, FeedQuery, FollowerGraph, IdentityStore, PostStore, RoleStore,
};

/// Adapters wired into a [`Storage`].
#[derive(Clone)]
pub struct StoragePorts {
    pub identity: Arc<dyn IdentityStore>,
    pub feed: Arc<dyn FeedQuery>,
    pub follows: Arc<dyn FollowerGraph>,
    pub posts: Arc<dyn PostStore>,
    pub comments: Arc<dyn CommentStore>,
    pub roles: Arc<dyn RoleStore>,
}

/// The storage facade handed to the transport layer.
///
/// Callers pull out the narrow capability they need rather than holding the
/// whole facade, so each handler depends on one contract.
#[derive(Clone)]
pub struct Storage {
    ports: StoragePorts,
}

impl Storage {
    #[must_use]
    pub fn new(ports: StoragePorts) -> Self {
        Self { ports }
    }

    /// Route id lookups through `cache` before the identity store.
    #[must_use]
    pub fn with_account_cache(mut self, cache: Arc<dyn AccountCache>) -> Self {
        self.ports.identity = Arc::new(CachedIdentityStore::new(self.ports.identity, cache));
        self
    }

    pub fn identity(&self) -> Arc<dyn IdentityStore> {
        Arc::clone(&self.ports.identity)
    }

    pub fn feed(&self) -> Arc<dyn FeedQuery> {
        Arc::clone(&self.ports.feed)
    }

    pub fn follows(&self) -> Arc<dyn FollowerGraph> {
        Arc::clone(&self.ports.follows)
    }

    pub fn posts(&self) -> Arc<dyn PostStore> {
        Arc::clone(&self.ports.posts)
    }

    pub fn comments(&self) -> Arc<dyn CommentStore> {
        Arc::clone(&self.ports.comments)
    }

    pub fn roles(&self) -> Arc<dyn RoleStore> {
        Arc::clone(&self.ports.roles)
    }
}
