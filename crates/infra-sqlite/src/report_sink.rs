// SQLite ReportSink Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use cadence_core::domain::CycleReport;
use cadence_core::error::{AppError, Result};
use cadence_core::port::ReportSink;
use sqlx::SqlitePool;
use tracing::debug;

/// Persists each cycle report with its results in a single transaction
pub struct SqliteReportSink {
    pool: SqlitePool,
}

impl SqliteReportSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportSink for SqliteReportSink {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn record(&self, report: &CycleReport) -> Result<()> {
        let cycle_id = i64::try_from(report.cycle_id()).map_err(|_| {
            AppError::Validation(format!("cycle id {} too large", report.cycle_id()))
        })?;

        // Dropped without commit on any error path -> rollback
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let report_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO cycle_reports (run_id, cycle_id, started_at, finished_at, status)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(report.run_id().to_string())
        .bind(cycle_id)
        .bind(report.started_at().timestamp_millis())
        .bind(report.finished_at().timestamp_millis())
        .bind(report.status().to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        for (position, result) in report.results().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO process_results (
                    report_id, position, unit, status, attempts, duration_ms, error
                ) VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(report_id)
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .bind(result.unit())
            .bind(result.status().to_string())
            .bind(i64::from(result.attempts()))
            .bind(i64::try_from(result.duration().as_millis()).unwrap_or(i64::MAX))
            .bind(result.error())
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(
            cycle_id = report.cycle_id(),
            report_id = report_id,
            results = report.results().len(),
            "Cycle report stored"
        );
        Ok(())
    }
}
