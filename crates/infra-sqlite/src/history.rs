// SQLite Cycle History - Persisted reports and aggregate statistics

use crate::error::map_sqlx_error;
use cadence_core::domain::{CycleReport, ProcessResult, ProcessStatus};
use cadence_core::error::{AppError, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Aggregate statistics over every stored cycle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HistoryStats {
    pub total_cycles: i64,
    pub successful: i64,
    pub degraded: i64,
    pub failed: i64,
    pub last_finished_at: Option<DateTime<Utc>>,
}

impl HistoryStats {
    /// Percentage of fully successful cycles (0 when nothing was recorded)
    pub fn success_rate(&self) -> f64 {
        if self.total_cycles == 0 {
            return 0.0;
        }
        self.successful as f64 / self.total_cycles as f64 * 100.0
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    id: i64,
    run_id: String,
    cycle_id: i64,
    started_at: i64,
    finished_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct ResultRow {
    unit: String,
    status: String,
    attempts: i64,
    duration_ms: i64,
    error: Option<String>,
}

impl ResultRow {
    fn into_result(self) -> Result<ProcessResult> {
        let status: ProcessStatus = self.status.parse()?;
        let attempts = u32::try_from(self.attempts).map_err(|_| {
            AppError::Database(format!("Invalid attempts value: {}", self.attempts))
        })?;
        let duration = Duration::from_millis(u64::try_from(self.duration_ms).unwrap_or(0));

        Ok(ProcessResult::restore(
            self.unit, status, attempts, duration, self.error,
        )?)
    }
}

/// Read/prune access to stored cycle reports
#[derive(Clone)]
pub struct SqliteHistory {
    pool: SqlitePool,
}

impl SqliteHistory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn stats(&self) -> Result<HistoryStats> {
        let (total_cycles, successful, degraded, failed, last_finished_at): (
            i64,
            i64,
            i64,
            i64,
            Option<i64>,
        ) = sqlx::query_as(
            r#"
            SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'SUCCESS' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'DEGRADED' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'FAILED' THEN 1 ELSE 0 END), 0),
                MAX(finished_at)
            FROM cycle_reports
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(HistoryStats {
            total_cycles,
            successful,
            degraded,
            failed,
            last_finished_at: last_finished_at.map(from_millis).transpose()?,
        })
    }

    /// Most recent reports, newest first
    pub async fn recent(&self, limit: u32) -> Result<Vec<CycleReport>> {
        let rows = sqlx::query_as::<_, ReportRow>(
            r#"
            SELECT id, run_id, cycle_id, started_at, finished_at
            FROM cycle_reports
            ORDER BY finished_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            reports.push(self.load_report(row).await?);
        }
        Ok(reports)
    }

    /// Delete reports that finished before `cutoff`; results go with them
    pub async fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cycle_reports WHERE finished_at < ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected();
        info!(deleted_reports = deleted, cutoff = %cutoff, "Cycle history pruned");
        Ok(deleted)
    }

    async fn load_report(&self, row: ReportRow) -> Result<CycleReport> {
        let results = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT unit, status, attempts, duration_ms, error
            FROM process_results
            WHERE report_id = ?
            ORDER BY position
            "#,
        )
        .bind(row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .into_iter()
        .map(ResultRow::into_result)
        .collect::<Result<Vec<_>>>()?;

        let run_id = Uuid::parse_str(&row.run_id)
            .map_err(|e| AppError::Database(format!("Invalid run id '{}': {}", row.run_id, e)))?;
        let cycle_id = u64::try_from(row.cycle_id)
            .map_err(|_| AppError::Database(format!("Invalid cycle id: {}", row.cycle_id)))?;

        // Status is derived from the results exactly as when it was stored
        Ok(CycleReport::begin(run_id, cycle_id, from_millis(row.started_at)?)
            .finish(results, from_millis(row.finished_at)?))
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| AppError::Database(format!("Timestamp out of range: {}", ms)))
}
