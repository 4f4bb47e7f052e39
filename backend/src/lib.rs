//! Storage core for the social-feed backend.
//!
//! The crate owns the data and identity layer: the account lifecycle
//! (invite, activate, delete), the personalised feed query, the follow graph,
//! and the read-through cache in front of identity lookups. Transport, token
//! issuance, and mail delivery live elsewhere and reach this crate only
//! through [`domain::Storage`].

pub mod config;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
