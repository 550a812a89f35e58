// Cycle Report Domain Model

use crate::domain::error::{DomainError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Cycle number within one service run (starts at 1)
pub type CycleId = u64;

/// Outcome of one process unit within a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Success => write!(f, "SUCCESS"),
            ProcessStatus::Failed => write!(f, "FAILED"),
            ProcessStatus::Skipped => write!(f, "SKIPPED"),
        }
    }
}

impl FromStr for ProcessStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SUCCESS" => Ok(ProcessStatus::Success),
            "FAILED" => Ok(ProcessStatus::Failed),
            "SKIPPED" => Ok(ProcessStatus::Skipped),
            other => Err(DomainError::ValidationError(format!(
                "Unknown process status: {}",
                other
            ))),
        }
    }
}

/// Overall outcome of a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CycleStatus {
    /// Every unit succeeded
    Success,
    /// Some units succeeded, some did not
    Degraded,
    /// No unit succeeded
    Failed,
}

impl CycleStatus {
    pub fn from_results(results: &[ProcessResult]) -> Self {
        let succeeded = results
            .iter()
            .filter(|r| r.status == ProcessStatus::Success)
            .count();

        if succeeded == results.len() {
            CycleStatus::Success
        } else if succeeded == 0 {
            CycleStatus::Failed
        } else {
            CycleStatus::Degraded
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleStatus::Success => write!(f, "SUCCESS"),
            CycleStatus::Degraded => write!(f, "DEGRADED"),
            CycleStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl FromStr for CycleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SUCCESS" => Ok(CycleStatus::Success),
            "DEGRADED" => Ok(CycleStatus::Degraded),
            "FAILED" => Ok(CycleStatus::Failed),
            other => Err(DomainError::ValidationError(format!(
                "Unknown cycle status: {}",
                other
            ))),
        }
    }
}

/// Result of one process unit execution
///
/// Fields are read-only: a result is produced once by the orchestrator and
/// never modified afterwards. `error` is present iff `status` is `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessResult {
    unit: String,
    status: ProcessStatus,
    attempts: u32,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    duration: Duration,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ProcessResult {
    pub fn succeeded(unit: impl Into<String>, attempts: u32, duration: Duration) -> Self {
        Self {
            unit: unit.into(),
            status: ProcessStatus::Success,
            attempts: attempts.max(1),
            duration,
            error: None,
        }
    }

    pub fn failed(
        unit: impl Into<String>,
        attempts: u32,
        duration: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            unit: unit.into(),
            status: ProcessStatus::Failed,
            attempts: attempts.max(1),
            duration,
            error: Some(error.into()),
        }
    }

    /// A unit that was never started in this cycle
    pub fn skipped(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            status: ProcessStatus::Skipped,
            attempts: 0,
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Rebuild a result from stored fields, enforcing the error/status invariant
    pub fn restore(
        unit: impl Into<String>,
        status: ProcessStatus,
        attempts: u32,
        duration: Duration,
        error: Option<String>,
    ) -> Result<Self> {
        let unit = unit.into();
        match (status, &error) {
            (ProcessStatus::Failed, None) => Err(DomainError::ValidationError(format!(
                "Failed result for '{}' has no error detail",
                unit
            ))),
            (ProcessStatus::Success | ProcessStatus::Skipped, Some(_)) => {
                Err(DomainError::ValidationError(format!(
                    "{} result for '{}' carries an error detail",
                    status, unit
                )))
            }
            _ => Ok(Self {
                unit,
                status,
                attempts,
                duration,
                error,
            }),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_success(&self) -> bool {
        self.status == ProcessStatus::Success
    }
}

/// Aggregate of all process results in one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    run_id: Uuid,
    cycle_id: CycleId,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    results: Vec<ProcessResult>,
    status: CycleStatus,
}

impl CycleReport {
    /// Open a report at cycle start
    pub fn begin(run_id: Uuid, cycle_id: CycleId, started_at: DateTime<Utc>) -> CycleReportBuilder {
        CycleReportBuilder {
            run_id,
            cycle_id,
            started_at,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn cycle_id(&self) -> CycleId {
        self.cycle_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    /// Results in configuration order
    pub fn results(&self) -> &[ProcessResult] {
        &self.results
    }

    pub fn status(&self) -> CycleStatus {
        self.status
    }

    pub fn result_for(&self, unit: &str) -> Option<&ProcessResult> {
        self.results.iter().find(|r| r.unit == unit)
    }

    pub fn count(&self, status: ProcessStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// A cycle report that has been started but not finalized
#[derive(Debug, Clone)]
pub struct CycleReportBuilder {
    run_id: Uuid,
    cycle_id: CycleId,
    started_at: DateTime<Utc>,
}

impl CycleReportBuilder {
    pub fn cycle_id(&self) -> CycleId {
        self.cycle_id
    }

    /// Finalize the report; the overall status is derived from `results`
    pub fn finish(self, results: Vec<ProcessResult>, finished_at: DateTime<Utc>) -> CycleReport {
        let status = CycleStatus::from_results(&results);
        CycleReport {
            run_id: self.run_id,
            cycle_id: self.cycle_id,
            started_at: self.started_at,
            finished_at: finished_at.max(self.started_at),
            results,
            status,
        }
    }
}

/// Human readable duration ("3.5s", "2m 5s", "1h 30m")
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 60.0 {
        return format!("{:.1}s", seconds);
    }

    let total = duration.as_secs();
    let minutes = total / 60;
    if minutes < 60 {
        return format!("{}m {}s", minutes, total % 60);
    }

    format!("{}h {}m", minutes / 60, minutes % 60)
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_cycle_status_rules() {
        let ok = ProcessResult::succeeded("a", 1, Duration::ZERO);
        let bad = ProcessResult::failed("b", 3, Duration::ZERO, "boom");
        let skipped = ProcessResult::skipped("c");

        assert_eq!(
            CycleStatus::from_results(&[ok.clone(), ok.clone()]),
            CycleStatus::Success
        );
        assert_eq!(
            CycleStatus::from_results(&[ok.clone(), bad.clone()]),
            CycleStatus::Degraded
        );
        assert_eq!(
            CycleStatus::from_results(&[bad.clone(), skipped.clone()]),
            CycleStatus::Failed
        );
        assert_eq!(
            CycleStatus::from_results(&[ok, skipped]),
            CycleStatus::Degraded
        );
    }

    #[test]
    fn test_error_present_iff_failed() {
        let ok = ProcessResult::succeeded("a", 2, Duration::from_millis(10));
        assert!(ok.error().is_none());

        let bad = ProcessResult::failed("b", 3, Duration::from_millis(10), "timeout");
        assert_eq!(bad.error(), Some("timeout"));

        let restored = ProcessResult::restore(
            "b",
            ProcessStatus::Failed,
            3,
            Duration::from_millis(10),
            None,
        );
        assert!(restored.is_err());

        let restored = ProcessResult::restore(
            "a",
            ProcessStatus::Success,
            1,
            Duration::ZERO,
            Some("unexpected".to_string()),
        );
        assert!(restored.is_err());
    }

    #[test]
    fn test_builder_finalizes_report() {
        let run_id = Uuid::new_v4();
        let builder = CycleReport::begin(run_id, 7, ts(100));
        assert_eq!(builder.cycle_id(), 7);

        let report = builder.finish(
            vec![
                ProcessResult::succeeded("sync", 1, Duration::from_secs(1)),
                ProcessResult::failed("report", 3, Duration::from_secs(2), "api down"),
            ],
            ts(105),
        );

        assert_eq!(report.run_id(), run_id);
        assert_eq!(report.cycle_id(), 7);
        assert_eq!(report.status(), CycleStatus::Degraded);
        assert_eq!(report.elapsed(), Duration::from_secs(5));
        assert_eq!(report.count(ProcessStatus::Failed), 1);
        assert_eq!(report.result_for("report").unwrap().attempts(), 3);
    }

    #[test]
    fn test_report_serializes_duration_as_millis() {
        let report = CycleReport::begin(Uuid::nil(), 1, ts(0)).finish(
            vec![ProcessResult::succeeded("a", 1, Duration::from_millis(1500))],
            ts(2),
        );

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["status"], "SUCCESS");
        assert_eq!(json["results"][0]["duration_ms"], 1500);
        assert!(json["results"][0].get("error").is_none());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "DEGRADED".parse::<CycleStatus>().unwrap(),
            CycleStatus::Degraded
        );
        assert_eq!(
            "SKIPPED".parse::<ProcessStatus>().unwrap(),
            ProcessStatus::Skipped
        );
        assert!("done".parse::<ProcessStatus>().is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(3500)), "3.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(5400)), "1h 30m");
    }
}
