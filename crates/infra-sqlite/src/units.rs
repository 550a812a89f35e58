// Database process units

use crate::error::unit_sqlx_error;
use crate::SqliteHistory;
use async_trait::async_trait;
use cadence_core::port::{ProcessUnit, TimeProvider, UnitContext, UnitError};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Executes one SQL statement inside a transaction per attempt
///
/// The connection is acquired for the attempt and released when the
/// transaction is committed or dropped (rolled back) on failure.
pub struct SqlStatementUnit {
    pool: SqlitePool,
    sql: String,
}

impl SqlStatementUnit {
    pub fn new(pool: SqlitePool, sql: impl Into<String>) -> Self {
        Self {
            pool,
            sql: sql.into(),
        }
    }
}

#[async_trait]
impl ProcessUnit for SqlStatementUnit {
    async fn run(&self, ctx: &UnitContext) -> Result<(), UnitError> {
        let mut tx = self.pool.begin().await.map_err(unit_sqlx_error)?;

        let result = sqlx::query(&self.sql)
            .execute(&mut *tx)
            .await
            .map_err(unit_sqlx_error)?;

        tx.commit().await.map_err(unit_sqlx_error)?;

        info!(
            unit = %ctx.unit,
            cycle_id = ctx.cycle_id,
            rows_affected = result.rows_affected(),
            "SQL statement executed"
        );
        Ok(())
    }
}

/// Housekeeping: deletes stored cycle reports older than the retention window
pub struct PruneHistoryUnit {
    history: SqliteHistory,
    retention: Duration,
    time_provider: Arc<dyn TimeProvider>,
}

impl PruneHistoryUnit {
    pub fn new(
        history: SqliteHistory,
        retention: Duration,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            history,
            retention,
            time_provider,
        }
    }
}

#[async_trait]
impl ProcessUnit for PruneHistoryUnit {
    async fn run(&self, ctx: &UnitContext) -> Result<(), UnitError> {
        let retention = chrono::Duration::from_std(self.retention).map_err(|_| {
            UnitError::Configuration(format!("retention {:?} is too large", self.retention))
        })?;
        let cutoff = self.time_provider.now() - retention;

        let deleted = self
            .history
            .prune_older_than(cutoff)
            .await
            .map_err(|e| UnitError::Database(e.to_string()))?;

        info!(
            unit = %ctx.unit,
            cycle_id = ctx.cycle_id,
            deleted_reports = deleted,
            retention_days = self.retention.as_secs() / 86_400,
            "History retention applied"
        );
        Ok(())
    }
}
