//! Error plumbing for multi-statement workflows.
//!
//! Workflows run inside `AsyncConnection::transaction`, which rolls back on
//! every `Err` return. Steps can fail with either a Diesel error or a domain
//! outcome such as an unknown token; [`WorkflowError`] carries both out of
//! the transaction closure so the rollback happens before classification.

use crate::domain::ports::StoreError;

use super::error_mapping::map_diesel_error;

#[derive(Debug)]
pub(crate) enum WorkflowError {
    Store(StoreError),
    Diesel(diesel::result::Error),
}

impl WorkflowError {
    pub(crate) fn into_store(self, operation: &'static str) -> StoreError {
        match self {
            Self::Store(err) => err,
            Self::Diesel(err) => map_diesel_error(err, operation),
        }
    }
}

impl From<diesel::result::Error> for WorkflowError {
    fn from(err: diesel::result::Error) -> Self {
        Self::Diesel(err)
    }
}

impl From<StoreError> for WorkflowError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}
