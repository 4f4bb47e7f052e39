//! Shared helpers for the backend integration suites.
//!
//! Each file under `backend/tests/` compiles as its own crate; suites that
//! need embedded PostgreSQL pull these helpers in with `mod support;`.

pub mod embedded_postgres;

/// Render a `postgres` error with its SQLSTATE and server message.
///
/// The plain `Display` output collapses server errors to `db error`, which
/// says nothing useful in CI logs.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };
    let mut summary = format!(
        "postgres error {:?}: {}",
        db_error.code(),
        db_error.message()
    );
    if let Some(detail) = db_error.detail() {
        summary.push_str("; detail: ");
        summary.push_str(detail);
    }
    summary
}

/// True when `SKIP_TEST_CLUSTER` is `1`, `true`, or `yes` (any case).
pub fn should_skip_test_cluster() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .is_ok_and(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes"))
}

/// True when a setup failure reads like missing network access, which is
/// how an offline sandbox fails to fetch the PostgreSQL binaries.
fn is_offline_failure(reason: &str) -> bool {
    const PATTERNS: [&str; 7] = [
        "error sending request",
        "error decoding response body",
        "dns error",
        "failed to lookup",
        "network unreachable",
        "connection refused",
        "timed out",
    ];
    let reason = reason.to_lowercase();
    PATTERNS.iter().any(|pattern| reason.contains(pattern))
}

/// Skip or fail a suite whose embedded cluster could not be prepared.
///
/// Prints a `SKIP-TEST-CLUSTER` marker and returns `None` when skipping is
/// enabled or the host is offline; otherwise panics so CI does not silently
/// lose coverage.
pub fn handle_cluster_setup_failure<T>(reason: impl std::fmt::Display) -> Option<T> {
    let reason = reason.to_string();
    if should_skip_test_cluster() || is_offline_failure(&reason) {
        eprintln!("SKIP-TEST-CLUSTER: {reason}");
        None
    } else {
        panic!("Test cluster setup failed: {reason}. Set SKIP_TEST_CLUSTER=1 to skip.");
    }
}
