//! Translation of pool and Diesel failures into [`StoreError`].
//!
//! Unique violations are classified by constraint name so duplicate email,
//! duplicate username, duplicate follow edges, and reused invitation tokens
//! stay distinguishable.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::{debug, warn};

use crate::domain::ports::StoreError;

use super::pool::PoolError;

const ACCOUNTS_EMAIL_KEY: &str = "accounts_email_key";
const ACCOUNTS_USERNAME_KEY: &str = "accounts_username_key";
const FOLLOW_EDGES_PKEY: &str = "follow_edges_pkey";
const INVITATION_TOKENS_PKEY: &str = "invitation_tokens_pkey";

/// Map pool errors to store errors.
pub(crate) fn map_pool_error(error: PoolError) -> StoreError {
    match error {
        PoolError::Timeout => StoreError::timeout(),
        PoolError::Checkout { message } | PoolError::Build { message } => {
            StoreError::internal(message)
        }
    }
}

/// Map a Diesel error raised by `operation` to a store error.
///
/// `NotFound` stays `NotFound`; every unclassified failure is `Internal`,
/// never absence.
pub(crate) fn map_diesel_error(error: DieselError, operation: &'static str) -> StoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), operation, "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            operation,
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => StoreError::not_found(),
        DieselError::QueryBuilderError(_) => StoreError::internal("database query error"),
        DieselError::DatabaseError(kind, info) => match kind {
            DatabaseErrorKind::UniqueViolation => {
                map_unique_violation(info.constraint_name(), operation)
            }
            DatabaseErrorKind::ForeignKeyViolation => StoreError::not_found(),
            DatabaseErrorKind::ClosedConnection => {
                StoreError::internal("database connection error")
            }
            _ => StoreError::internal("database error"),
        },
        _ => StoreError::internal("database error"),
    }
}

fn map_unique_violation(constraint: Option<&str>, operation: &'static str) -> StoreError {
    match constraint {
        Some(ACCOUNTS_EMAIL_KEY) => StoreError::duplicate_email(),
        Some(ACCOUNTS_USERNAME_KEY) => StoreError::duplicate_username(),
        Some(FOLLOW_EDGES_PKEY) => StoreError::conflict("follow edge already exists"),
        Some(INVITATION_TOKENS_PKEY) => StoreError::conflict("invitation token already issued"),
        other => {
            // New unique constraints need an explicit mapping above.
            warn!(
                constraint_name = ?other,
                operation,
                "unrecognised unique violation"
            );
            StoreError::conflict("unique constraint violated")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Info {
        constraint: Option<&'static str>,
    }

    impl diesel::result::DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            None
        }

        fn column_name(&self) -> Option<&str> {
            None
        }

        fn constraint_name(&self) -> Option<&str> {
            self.constraint
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    fn database_error(kind: DatabaseErrorKind, constraint: Option<&'static str>) -> DieselError {
        DieselError::DatabaseError(kind, Box::new(Info { constraint }))
    }

    #[rstest]
    #[case(Some(ACCOUNTS_EMAIL_KEY), StoreError::DuplicateEmail)]
    #[case(Some(ACCOUNTS_USERNAME_KEY), StoreError::DuplicateUsername)]
    #[case(
        Some(FOLLOW_EDGES_PKEY),
        StoreError::conflict("follow edge already exists")
    )]
    #[case(
        Some(INVITATION_TOKENS_PKEY),
        StoreError::conflict("invitation token already issued")
    )]
    #[case(Some("other_key"), StoreError::conflict("unique constraint violated"))]
    #[case(None, StoreError::conflict("unique constraint violated"))]
    fn unique_violations_map_by_constraint(
        #[case] constraint: Option<&'static str>,
        #[case] expected: StoreError,
    ) {
        let error = database_error(DatabaseErrorKind::UniqueViolation, constraint);
        assert_eq!(map_diesel_error(error, "test"), expected);
    }

    #[rstest]
    fn foreign_key_violation_is_not_found() {
        let error = database_error(DatabaseErrorKind::ForeignKeyViolation, None);
        assert_eq!(map_diesel_error(error, "test"), StoreError::NotFound);
    }

    #[rstest]
    fn unknown_faults_are_internal_not_absence() {
        let error = database_error(DatabaseErrorKind::SerializationFailure, None);
        assert!(matches!(
            map_diesel_error(error, "test"),
            StoreError::Internal { .. }
        ));
        assert!(matches!(
            map_diesel_error(DieselError::RollbackTransaction, "test"),
            StoreError::Internal { .. }
        ));
    }

    #[rstest]
    fn pool_timeout_is_timeout() {
        assert_eq!(map_pool_error(PoolError::Timeout), StoreError::Timeout);
        assert!(matches!(
            map_pool_error(PoolError::checkout("refused")),
            StoreError::Internal { .. }
        ));
    }
}
