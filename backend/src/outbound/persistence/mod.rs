//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! This module provides concrete implementations of the storage ports backed
//! by PostgreSQL via Diesel with async support through `diesel-async` and
//! `bb8` connection pooling.
//!
//! # Architecture
//!
//! - **Thin adapters**: implementations only translate between Diesel rows
//!   and domain types.
//! - **Internal models**: row structs (`models.rs`) and the schema
//!   (`schema.rs`) never leave this module.
//! - **Typed errors**: every pool and Diesel failure is classified into a
//!   `StoreError` before it crosses a port.
//! - **Bounded calls**: each call runs under the caller's deadline capped by
//!   the pool's query timeout.
//!
//! # Example
//!
//! ```ignore
//! use social_backend::outbound::persistence::{DbPool, DieselIdentityStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/social")).await?;
//! let identity = DieselIdentityStore::new(pool);
//! ```

mod diesel_comment_store;
mod diesel_feed_query;
mod diesel_follower_graph;
mod diesel_identity_store;
mod diesel_post_store;
mod diesel_role_store;
mod error_mapping;
mod feed_sql;
mod models;
mod pool;
mod schema;
mod transaction;

use diesel_migrations::{EmbeddedMigrations, embed_migrations};

pub use diesel_comment_store::DieselCommentStore;
pub use diesel_feed_query::DieselFeedQuery;
pub use diesel_follower_graph::DieselFollowerGraph;
pub use diesel_identity_store::DieselIdentityStore;
pub use diesel_post_store::DieselPostStore;
pub use diesel_role_store::DieselRoleStore;
pub use pool::{DbPool, PoolConfig, PoolError};

/// Schema migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");
