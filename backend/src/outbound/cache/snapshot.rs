//! Serialised account snapshots stored in the cache.
//!
//! Snapshots never carry the password credential; a cached account always
//! comes back without one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ports::StoreError;
use crate::domain::{Account, AccountId, AccountParts, Email, Role, RoleName, Username};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleSnapshot {
    id: i64,
    name: String,
    description: String,
    level: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountSnapshot {
    id: i64,
    username: String,
    email: String,
    created_at: DateTime<Utc>,
    is_active: bool,
    role: RoleSnapshot,
}

/// Cache key for an account id.
pub(crate) fn account_cache_key(id: AccountId) -> String {
    format!("account-{id}")
}

pub(crate) fn encode(account: &Account) -> Result<String, StoreError> {
    let role = account.role();
    let snapshot = AccountSnapshot {
        id: account.id().get(),
        username: account.username().as_str().to_owned(),
        email: account.email().as_str().to_owned(),
        created_at: account.created_at(),
        is_active: account.is_active(),
        role: RoleSnapshot {
            id: role.id,
            name: role.name.as_str().to_owned(),
            description: role.description.clone(),
            level: role.level,
        },
    };
    serde_json::to_string(&snapshot)
        .map_err(|err| StoreError::internal(format!("account snapshot encode failed: {err}")))
}

/// Decode a cached snapshot. Any fault is `Internal`, never a miss.
pub(crate) fn decode(raw: &str) -> Result<Account, StoreError> {
    let snapshot: AccountSnapshot = serde_json::from_str(raw)
        .map_err(|err| StoreError::internal(format!("account snapshot decode failed: {err}")))?;
    let invalid = |err: crate::domain::AccountValidationError| {
        StoreError::internal(format!("account snapshot holds invalid data: {err}"))
    };
    Ok(Account::from_parts(AccountParts {
        id: AccountId::new(snapshot.id),
        username: Username::new(snapshot.username).map_err(invalid)?,
        email: Email::new(snapshot.email).map_err(invalid)?,
        created_at: snapshot.created_at,
        is_active: snapshot.is_active,
        role: Role {
            id: snapshot.role.id,
            name: RoleName::new(snapshot.role.name).map_err(invalid)?,
            description: snapshot.role.description,
            level: snapshot.role.level,
        },
    }))
}
