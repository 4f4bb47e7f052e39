//! Deadline enforcement shared by every outbound adapter.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::domain::CallContext;
use crate::domain::ports::StoreError;

/// Run `call` within the tighter of the caller's deadline and `limit`.
///
/// A collapsed deadline fails with [`StoreError::Timeout`] before `call` is
/// polled, so no I/O starts. When the budget elapses mid-flight the future is
/// dropped; an open transaction is abandoned with its connection and never
/// commits.
pub(crate) async fn within_deadline<T, F>(
    ctx: &CallContext,
    limit: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let budget = ctx.budget(limit);
    if budget.is_zero() {
        debug!(operation, "deadline elapsed before call");
        return Err(StoreError::timeout());
    }
    if let Ok(result) = tokio::time::timeout(budget, call).await {
        result
    } else {
        debug!(operation, budget_ms = budget.as_millis(), "storage call timed out");
        Err(StoreError::timeout())
    }
}
