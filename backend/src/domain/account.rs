//! Account identity model.
//!
//! Accounts are created inactive with an outstanding invitation, or directly
//! active on the seed/admin path. Read APIs only ever see active accounts.

use std::fmt;

use chrono::{DateTime, Utc};

use super::password::PasswordCredential;

/// Maximum accepted username length in characters.
pub const USERNAME_MAX: usize = 100;
/// Maximum accepted email length in characters.
pub const EMAIL_MAX: usize = 255;
/// Role assigned when the caller does not name one.
pub const DEFAULT_ROLE: &str = "user";

/// Validation errors returned by account value constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountValidationError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("username must be at most {max} characters")]
    UsernameTooLong { max: usize },
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("email must be at most {max} characters")]
    EmailTooLong { max: usize },
    #[error("email must contain a local part and a domain")]
    MalformedEmail,
    #[error("role name must not be empty")]
    EmptyRoleName,
}

/// Opaque numeric account identifier.
///
/// Zero is the unset value: rows that have not been persisted yet carry it,
/// and the cache refuses to store it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId(i64);

impl AccountId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw identifier value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// True when the identifier has not been assigned by the store.
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Globally unique login handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Validate and construct a [`Username`].
    pub fn new(value: impl Into<String>) -> Result<Self, AccountValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AccountValidationError::EmptyUsername);
        }
        if value.chars().count() > USERNAME_MAX {
            return Err(AccountValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        Ok(Self(value))
    }

    /// Borrow the username.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Globally unique contact address.
///
/// Only structural checks happen here; deliverability and format policy live
/// in the request validation layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Validate and construct an [`Email`].
    pub fn new(value: impl Into<String>) -> Result<Self, AccountValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AccountValidationError::EmptyEmail);
        }
        if value.chars().count() > EMAIL_MAX {
            return Err(AccountValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        match value.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(Self(value)),
            _ => Err(AccountValidationError::MalformedEmail),
        }
    }

    /// Borrow the address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a role row, e.g. `user` or `admin`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleName(String);

impl RoleName {
    /// Validate and construct a [`RoleName`].
    pub fn new(value: impl Into<String>) -> Result<Self, AccountValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AccountValidationError::EmptyRoleName);
        }
        Ok(Self(value))
    }

    /// Borrow the role name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoleName {
    fn default() -> Self {
        Self(DEFAULT_ROLE.to_owned())
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Permission tier referenced by accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: i64,
    pub name: RoleName,
    pub description: String,
    pub level: i32,
}

/// Persisted account.
///
/// ## Invariants
/// - `username` and `email` are unique across all accounts.
/// - `credential` is only populated by lookups that need it (email lookup
///   for login); id lookups and cache snapshots never carry it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: AccountId,
    username: Username,
    email: Email,
    created_at: DateTime<Utc>,
    is_active: bool,
    role: Role,
    credential: Option<PasswordCredential>,
}

/// Field bundle for [`Account::from_parts`].
#[derive(Debug, Clone)]
pub struct AccountParts {
    pub id: AccountId,
    pub username: Username,
    pub email: Email,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub role: Role,
}

impl Account {
    /// Assemble an account from validated parts without a credential.
    #[must_use]
    pub fn from_parts(parts: AccountParts) -> Self {
        let AccountParts {
            id,
            username,
            email,
            created_at,
            is_active,
            role,
        } = parts;
        Self {
            id,
            username,
            email,
            created_at,
            is_active,
            role,
            credential: None,
        }
    }

    /// Attach the stored credential.
    #[must_use]
    pub fn with_credential(mut self, credential: PasswordCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn role(&self) -> &Role {
        &self.role
    }

    /// Stored credential, when the lookup loaded it.
    pub fn credential(&self) -> Option<&PasswordCredential> {
        self.credential.as_ref()
    }

    /// Verify a login secret against the stored credential.
    ///
    /// Returns false when no credential was loaded.
    #[must_use]
    pub fn verify_password(&self, candidate: &str) -> bool {
        self.credential
            .as_ref()
            .is_some_and(|credential| credential.verify(candidate))
    }
}

/// Account data supplied by callers before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewAccount {
    username: Username,
    email: Email,
    credential: PasswordCredential,
    role: RoleName,
    active: bool,
}

impl NewAccount {
    /// Build an inactive account request with the default role.
    #[must_use]
    pub fn new(username: Username, email: Email, credential: PasswordCredential) -> Self {
        Self {
            username,
            email,
            credential,
            role: RoleName::default(),
            active: false,
        }
    }

    /// Resolve the account against a different role.
    #[must_use]
    pub fn with_role(mut self, role: RoleName) -> Self {
        self.role = role;
        self
    }

    /// Create the account already active (seed and admin path).
    ///
    /// Invitation workflows ignore this flag: invited accounts always start
    /// inactive.
    #[must_use]
    pub fn activated(mut self) -> Self {
        self.active = true;
        self
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn credential(&self) -> &PasswordCredential {
        &self.credential
    }

    pub fn role(&self) -> &RoleName {
        &self.role
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}
