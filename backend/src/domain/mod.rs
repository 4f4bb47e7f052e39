//! Domain types and capability ports for the storage core.
//!
//! Nothing here depends on Diesel or Redis; adapters in
//! [`crate::outbound`] implement the ports.

mod account;
mod cached_identity;
mod context;
mod feed;
mod follow;
mod invitation;
mod password;
mod post;
pub mod ports;
mod storage;

pub use account::{
    Account, AccountId, AccountParts, AccountValidationError, DEFAULT_ROLE, EMAIL_MAX, Email,
    NewAccount, Role, RoleName, USERNAME_MAX, Username,
};
pub use cached_identity::CachedIdentityStore;
pub use context::CallContext;
pub use feed::{
    FEED_LIMIT_MAX, FEED_SEARCH_MAX, FEED_TAGS_MAX, FeedFilter, FeedFilterBuilder,
    FeedFilterError, FeedItem, SortDirection,
};
pub use follow::FollowEdge;
pub use invitation::{InvitationToken, TokenHash};
pub use password::{CredentialError, PasswordCredential};
pub use post::{Comment, CommentId, CommentWithAuthor, NewComment, NewPost, Post, PostId};
pub use storage::{Storage, StoragePorts};
