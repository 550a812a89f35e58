//! Shared fixtures for the end-to-end tests

use cadence_core::application::{RetryPolicy, UnitSpec};
use cadence_core::port::ProcessUnit;
use cadence_infra_sqlite::{create_pool, run_migrations};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// On-disk history database with the schema applied
///
/// The database lives as long as the returned `TempDir`.
pub async fn history_db() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}", dir.path().join("history.db").display());
    let pool = create_pool(&url).await.expect("pool");
    run_migrations(&pool).await.expect("migrations");
    (dir, pool)
}

/// Unit spec with short real-time backoff (10ms, 20ms, ...)
pub fn quick_spec(name: &str, unit: Arc<dyn ProcessUnit>, max_attempts: u32) -> UnitSpec {
    UnitSpec::new(name, unit).with_policy(
        RetryPolicy::new(max_attempts, Duration::from_millis(10)).with_multiplier(2.0),
    )
}
