//! Deadline-bearing call context passed as the first argument of every port.

use std::time::Duration;

use tokio::time::Instant;

/// Per-call deadline.
///
/// A context without a deadline defers entirely to the adapter's configured
/// query timeout. Collapsing the deadline (e.g. [`CallContext::expired`])
/// cancels the call before any I/O is attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// Context with no caller-imposed deadline.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Context whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Context that expires at `deadline`.
    #[must_use]
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    /// Context whose deadline has already passed.
    #[must_use]
    pub fn expired() -> Self {
        Self::with_deadline(Instant::now())
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, or `None` when unbounded.
    ///
    /// Saturates at zero once the deadline has passed.
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Effective budget for a call capped by an adapter limit.
    #[must_use]
    pub fn budget(&self, limit: Duration) -> Duration {
        self.remaining()
            .map_or(limit, |remaining| remaining.min(limit))
    }

    /// True once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|remaining| remaining.is_zero())
    }
}
