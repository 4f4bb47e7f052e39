//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and never
//! leave it. Conversions into domain types validate stored values and report
//! corrupt rows as internal errors.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Array, Int4, Int8, Text, Timestamptz};

use crate::domain::ports::StoreError;
use crate::domain::{
    Account, AccountId, AccountParts, Comment, CommentId, Email, FeedItem, PasswordCredential,
    Post, PostId, Role, RoleName, Username,
};

use super::schema::{accounts, comments, follow_edges, invitation_tokens, posts, roles};

// ---------------------------------------------------------------------------
// Roles and accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = roles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RoleRow {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub level: i32,
}

impl RoleRow {
    pub(crate) fn into_domain(self) -> Result<Role, StoreError> {
        let name = RoleName::new(self.name).map_err(corrupt("role"))?;
        Ok(Role {
            id: self.id,
            name,
            description: self.description,
            level: self.level,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct AccountRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub role_id: i64,
}

impl AccountRow {
    /// Combine an account row with its joined role.
    ///
    /// The stored hash is only attached when `with_credential` is set. A role
    /// that does not match `role_id` marks the row as corrupt.
    pub(crate) fn into_domain(
        self,
        role: RoleRow,
        with_credential: bool,
    ) -> Result<Account, StoreError> {
        if self.role_id != role.id {
            return Err(StoreError::internal(format!(
                "corrupted account row in database: role {} joined for role_id {}",
                role.id, self.role_id
            )));
        }
        let username = Username::new(self.username).map_err(corrupt("account"))?;
        let email = Email::new(self.email).map_err(corrupt("account"))?;
        let account = Account::from_parts(AccountParts {
            id: AccountId::new(self.id),
            username,
            email,
            created_at: self.created_at,
            is_active: self.is_active,
            role: role.into_domain()?,
        });
        Ok(if with_credential {
            account.with_credential(PasswordCredential::from_hash(self.password_hash))
        } else {
            account
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub(crate) struct NewAccountRow<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_active: bool,
    pub role_id: i64,
}

// ---------------------------------------------------------------------------
// Invitations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = invitation_tokens)]
pub(crate) struct NewInvitationRow<'a> {
    pub token_hash: &'a str,
    pub account_id: i64,
    pub expiry: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Posts and comments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i32,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Self {
            id: PostId::new(row.id),
            author_id: AccountId::new(row.author_id),
            title: row.title,
            content: row.content,
            tags: row.tags,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
pub(crate) struct NewPostRow<'a> {
    pub author_id: i64,
    pub title: &'a str,
    pub content: &'a str,
    pub tags: &'a Vec<String>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: CommentId::new(row.id),
            post_id: PostId::new(row.post_id),
            author_id: AccountId::new(row.author_id),
            content: row.content,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = comments)]
pub(crate) struct NewCommentRow<'a> {
    pub post_id: i64,
    pub author_id: i64,
    pub content: &'a str,
}

// ---------------------------------------------------------------------------
// Follow edges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = follow_edges)]
pub(crate) struct NewFollowEdgeRow {
    pub follower_id: i64,
    pub followed_id: i64,
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

/// One row of the raw feed aggregate query.
#[derive(Debug, Clone, QueryableByName)]
pub(crate) struct FeedRow {
    #[diesel(sql_type = Int8)]
    pub id: i64,
    #[diesel(sql_type = Int8)]
    pub author_id: i64,
    #[diesel(sql_type = Text)]
    pub title: String,
    #[diesel(sql_type = Text)]
    pub content: String,
    #[diesel(sql_type = Array<Text>)]
    pub tags: Vec<String>,
    #[diesel(sql_type = Timestamptz)]
    pub created_at: DateTime<Utc>,
    #[diesel(sql_type = Timestamptz)]
    pub updated_at: DateTime<Utc>,
    #[diesel(sql_type = Int4)]
    pub version: i32,
    #[diesel(sql_type = Text)]
    pub author_username: String,
    #[diesel(sql_type = Int8)]
    pub comment_count: i64,
}

impl From<FeedRow> for FeedItem {
    fn from(row: FeedRow) -> Self {
        Self {
            post: Post {
                id: PostId::new(row.id),
                author_id: AccountId::new(row.author_id),
                title: row.title,
                content: row.content,
                tags: row.tags,
                created_at: row.created_at,
                updated_at: row.updated_at,
                version: row.version,
            },
            author_username: row.author_username,
            comment_count: row.comment_count,
        }
    }
}

fn corrupt<E: std::fmt::Display>(entity: &'static str) -> impl FnOnce(E) -> StoreError {
    move |err| StoreError::internal(format!("corrupted {entity} row in database: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn user_role() -> RoleRow {
        RoleRow {
            id: 1,
            name: "user".to_owned(),
            description: "Regular user".to_owned(),
            level: 1,
        }
    }

    fn account_row(role_id: i64) -> AccountRow {
        AccountRow {
            id: 7,
            username: "mona".to_owned(),
            email: "mona@x.com".to_owned(),
            password_hash: "$argon2id$stored".to_owned(),
            created_at: Utc::now(),
            is_active: true,
            role_id,
        }
    }

    #[rstest]
    fn credential_is_attached_only_on_request(user_role: RoleRow) {
        let bare = account_row(1)
            .into_domain(user_role.clone(), false)
            .expect("valid row");
        assert!(bare.credential().is_none());
        assert_eq!(bare.role().name.as_str(), "user");

        let with_hash = account_row(1)
            .into_domain(user_role, true)
            .expect("valid row");
        assert!(with_hash.credential().is_some());
    }

    #[rstest]
    fn mismatched_role_join_is_corruption(user_role: RoleRow) {
        let err = account_row(3)
            .into_domain(user_role, false)
            .expect_err("role mismatch");
        assert!(matches!(err, StoreError::Internal { .. }));
    }

    #[rstest]
    fn invalid_stored_username_is_corruption(user_role: RoleRow) {
        let mut row = account_row(1);
        row.username = String::new();
        let err = row.into_domain(user_role, false).expect_err("empty username");
        assert!(matches!(err, StoreError::Internal { .. }));
    }
}
