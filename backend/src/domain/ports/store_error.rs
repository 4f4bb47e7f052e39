//! Error taxonomy shared by every storage port.

use super::define_port_error;

define_port_error! {
    /// Failures surfaced by identity, feed, follow, post, comment, role, and
    /// cache adapters.
    ///
    /// Driver, pool, and serialisation faults never cross a port boundary in
    /// their native form; adapters classify them into these variants.
    pub enum StoreError {
        /// The record does not exist or is not visible to read APIs.
        NotFound => "record not found",
        /// A unique constraint rejected the write.
        Conflict { message: String } => "conflict: {message}",
        /// Another account already uses the email address.
        DuplicateEmail => "an account with that email already exists",
        /// Another account already uses the username.
        DuplicateUsername => "an account with that username already exists",
        /// Input rejected at the store boundary before any I/O.
        InvalidEntity { message: String } => "invalid entity: {message}",
        /// No unexpired invitation matches the supplied token.
        TokenNotFoundOrExpired => "invitation token not found or expired",
        /// The call deadline elapsed before the backing store answered.
        Timeout => "storage deadline exceeded",
        /// Unclassified driver, pool, or serialisation fault.
        Internal { message: String } => "internal storage error: {message}",
    }
}

impl StoreError {
    /// Report whether the error belongs to the unique-constraint class.
    ///
    /// Duplicate email and username are specialisations of a conflict, so
    /// transport layers that only distinguish "409-like" failures can test
    /// this instead of matching three variants.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::DuplicateEmail | Self::DuplicateUsername
        )
    }
}
