//! Directed follow relationships.

use super::AccountId;

/// Directed edge recording that `follower` sees `followed`'s posts.
///
/// Self-edges are representable; the graph store does not reject them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FollowEdge {
    pub follower: AccountId,
    pub followed: AccountId,
}

impl FollowEdge {
    #[must_use]
    pub const fn new(follower: AccountId, followed: AccountId) -> Self {
        Self { follower, followed }
    }

    #[must_use]
    pub fn is_self_follow(&self) -> bool {
        self.follower == self.followed
    }
}
