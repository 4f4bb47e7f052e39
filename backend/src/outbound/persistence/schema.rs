//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match `migrations/` exactly. Regenerate with
//! `diesel print-schema` when a migration changes a table.

diesel::table! {
    /// Permission tiers, seeded by migration.
    roles (id) {
        id -> Int8,
        name -> Varchar,
        description -> Text,
        level -> Int4,
    }
}

diesel::table! {
    /// Accounts; `is_active` gates every read API.
    accounts (id) {
        id -> Int8,
        username -> Varchar,
        email -> Varchar,
        /// Argon2id PHC string.
        password_hash -> Text,
        created_at -> Timestamptz,
        is_active -> Bool,
        role_id -> Int8,
    }
}

diesel::table! {
    /// Outstanding invitations, keyed by the SHA-256 of the raw token.
    invitation_tokens (token_hash) {
        token_hash -> Text,
        account_id -> Int8,
        expiry -> Timestamptz,
    }
}

diesel::table! {
    posts (id) {
        id -> Int8,
        author_id -> Int8,
        title -> Text,
        content -> Text,
        tags -> Array<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        /// Optimistic concurrency counter.
        version -> Int4,
    }
}

diesel::table! {
    comments (id) {
        id -> Int8,
        post_id -> Int8,
        author_id -> Int8,
        content -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Directed follow edges; the composite key enforces uniqueness.
    follow_edges (follower_id, followed_id) {
        follower_id -> Int8,
        followed_id -> Int8,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(accounts -> roles (role_id));
diesel::joinable!(invitation_tokens -> accounts (account_id));
diesel::joinable!(posts -> accounts (author_id));
diesel::joinable!(comments -> posts (post_id));
diesel::joinable!(comments -> accounts (author_id));

diesel::allow_tables_to_appear_in_same_query!(
    roles,
    accounts,
    invitation_tokens,
    posts,
    comments,
    follow_edges,
);
