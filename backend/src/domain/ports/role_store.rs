//! Port for role lookups.
use async_trait::async_trait;

use crate::domain::{CallContext, Role, RoleName};

use super::StoreError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Resolve a role by name; an unknown name is [`StoreError::NotFound`].
    async fn get_by_name(&self, ctx: &CallContext, name: &RoleName) -> Result<Role, StoreError>;
}
