//! Cycle Orchestrator - Runs the configured process units once
//!
//! Execution modes:
//! - Sequential: one unit after the other, failures do not block later units
//! - Parallel: all units interleaved on the current task
//! - CriticalFirst: one designated unit alone, then the rest in parallel
//!
//! Results are always reported in configuration order, whatever the
//! completion order was.

use crate::application::panic_guard::guarded;
use crate::application::retry::{retry_with_backoff, RetryCondition, RetryPolicy};
use crate::domain::{format_duration, CycleId, CycleReport, ProcessResult, ProcessStatus};
use crate::error::{AppError, Result};
use crate::port::{ProcessUnit, SystemTimeProvider, TimeProvider, UnitContext};
use futures::future::join_all;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// A named unit with its retry configuration
#[derive(Clone)]
pub struct UnitSpec {
    name: String,
    unit: Arc<dyn ProcessUnit>,
    policy: RetryPolicy,
    condition: RetryCondition,
}

impl UnitSpec {
    pub fn new(name: impl Into<String>, unit: Arc<dyn ProcessUnit>) -> Self {
        Self {
            name: name.into(),
            unit,
            policy: RetryPolicy::default(),
            condition: RetryCondition::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn retry_if(mut self, condition: RetryCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl fmt::Debug for UnitSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitSpec")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .field("condition", &self.condition)
            .finish()
    }
}

/// What happens to the other units when the critical unit fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CriticalFailure {
    /// Record every other unit as skipped
    #[default]
    SkipRemaining,
    /// Run the other units anyway
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    Sequential,
    #[default]
    Parallel,
    CriticalFirst {
        unit: String,
        on_failure: CriticalFailure,
    },
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Sequential => write!(f, "sequential"),
            ExecutionMode::Parallel => write!(f, "parallel"),
            ExecutionMode::CriticalFirst { unit, .. } => write!(f, "critical_first({})", unit),
        }
    }
}

/// Runs one cycle over an ordered list of units
pub struct CycleOrchestrator {
    units: Vec<UnitSpec>,
    mode: ExecutionMode,
    run_id: Uuid,
    time_provider: Arc<dyn TimeProvider>,
}

impl CycleOrchestrator {
    /// Create an orchestrator after validating the unit list against the mode
    pub fn new(units: Vec<UnitSpec>, mode: ExecutionMode) -> Result<Self> {
        validate_units(&units, &mode)?;
        Ok(Self {
            units,
            mode,
            run_id: Uuid::new_v4(),
            time_provider: Arc::new(SystemTimeProvider),
        })
    }

    /// Override the wall clock used for report timestamps
    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    /// Identifier shared by every report of this process lifetime
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.name.as_str()).collect()
    }

    /// Run every configured unit once and build the cycle report
    ///
    /// A unit that exhausts its retries is recorded as failed and does not stop
    /// the cycle. A unit that panics is a cycle-fatal error.
    pub async fn run_cycle(&self, cycle_id: CycleId) -> Result<CycleReport> {
        let report = CycleReport::begin(self.run_id, cycle_id, self.time_provider.now());
        let started = Instant::now();

        info!(
            cycle_id = cycle_id,
            run_id = %self.run_id,
            units = self.units.len(),
            mode = %self.mode,
            "Cycle started"
        );

        let results = match &self.mode {
            ExecutionMode::Sequential => self.run_sequential(cycle_id).await?,
            ExecutionMode::Parallel => {
                let all: Vec<&UnitSpec> = self.units.iter().collect();
                self.run_parallel(cycle_id, &all).await?
            }
            ExecutionMode::CriticalFirst { unit, on_failure } => {
                self.run_critical_first(cycle_id, unit, *on_failure).await?
            }
        };

        let report = report.finish(results, self.time_provider.now());
        let elapsed = started.elapsed();

        info!(
            cycle_id = cycle_id,
            status = %report.status(),
            succeeded = report.count(ProcessStatus::Success),
            failed = report.count(ProcessStatus::Failed),
            skipped = report.count(ProcessStatus::Skipped),
            duration_ms = millis(elapsed),
            "Cycle finished in {}",
            format_duration(elapsed)
        );

        Ok(report)
    }

    async fn run_sequential(&self, cycle_id: CycleId) -> Result<Vec<ProcessResult>> {
        let mut results = Vec::with_capacity(self.units.len());
        for spec in &self.units {
            results.push(execute_unit(spec, cycle_id).await?);
        }
        Ok(results)
    }

    /// Interleave the given units on this task; output follows input order
    async fn run_parallel(
        &self,
        cycle_id: CycleId,
        specs: &[&UnitSpec],
    ) -> Result<Vec<ProcessResult>> {
        let outcomes = join_all(specs.iter().map(|spec| execute_unit(spec, cycle_id))).await;
        // Every unit has finished at this point; the first fatal error wins
        outcomes.into_iter().collect()
    }

    async fn run_critical_first(
        &self,
        cycle_id: CycleId,
        critical: &str,
        on_failure: CriticalFailure,
    ) -> Result<Vec<ProcessResult>> {
        let critical_index = self
            .units
            .iter()
            .position(|u| u.name == critical)
            .ok_or_else(|| AppError::Internal(format!("Critical unit '{}' missing", critical)))?;

        let critical_result = execute_unit(&self.units[critical_index], cycle_id).await?;

        let others: Vec<&UnitSpec> = self
            .units
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != critical_index)
            .map(|(_, spec)| spec)
            .collect();

        let run_others = critical_result.is_success() || on_failure == CriticalFailure::Continue;
        let other_results = if run_others {
            self.run_parallel(cycle_id, &others).await?
        } else {
            warn!(
                cycle_id = cycle_id,
                unit = %critical,
                skipped = others.len(),
                "Critical unit failed, skipping remaining units"
            );
            others
                .iter()
                .map(|spec| {
                    info!(
                        cycle_id = cycle_id,
                        unit = %spec.name,
                        status = %ProcessStatus::Skipped,
                        attempts = 0,
                        "Unit skipped"
                    );
                    ProcessResult::skipped(spec.name.clone())
                })
                .collect()
        };

        // Restore configuration order
        let mut other_results = other_results.into_iter();
        let mut critical_result = Some(critical_result);
        let mut results = Vec::with_capacity(self.units.len());
        for index in 0..self.units.len() {
            let next = if index == critical_index {
                critical_result.take()
            } else {
                other_results.next()
            };
            if let Some(result) = next {
                results.push(result);
            }
        }
        Ok(results)
    }
}

/// Run one unit through the retry helper and record its outcome
async fn execute_unit(spec: &UnitSpec, cycle_id: CycleId) -> Result<ProcessResult> {
    let started = Instant::now();

    let attempts = retry_with_backoff(&spec.name, &spec.policy, &spec.condition, |attempt| {
        let ctx = UnitContext::new(cycle_id, spec.name.clone(), attempt);
        let unit = Arc::clone(&spec.unit);
        async move { unit.run(&ctx).await }
    })
    // Retry logs from inside the helper inherit the cycle and unit fields
    .instrument(info_span!("unit", cycle_id = cycle_id, unit = %spec.name));

    let outcome = guarded(&spec.name, attempts)
        .await
        .map_err(|detail| AppError::CycleFatal {
            cycle_id,
            unit: spec.name.clone(),
            detail,
        })?;
    let duration = started.elapsed();

    let result = match outcome {
        Ok(done) => ProcessResult::succeeded(spec.name.clone(), done.attempts, duration),
        Err(failure) => ProcessResult::failed(
            spec.name.clone(),
            failure.attempts,
            duration,
            failure.source.to_string(),
        ),
    };

    if result.is_success() {
        info!(
            cycle_id = cycle_id,
            unit = %result.unit(),
            status = %result.status(),
            attempts = result.attempts(),
            duration_ms = millis(duration),
            "Unit finished"
        );
    } else {
        error!(
            cycle_id = cycle_id,
            unit = %result.unit(),
            status = %result.status(),
            attempts = result.attempts(),
            duration_ms = millis(duration),
            error = result.error().unwrap_or_default(),
            "Unit finished"
        );
    }

    Ok(result)
}

fn validate_units(units: &[UnitSpec], mode: &ExecutionMode) -> Result<()> {
    if units.is_empty() {
        return Err(AppError::Validation(
            "at least one process unit must be configured".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for spec in units {
        if spec.name.trim().is_empty() {
            return Err(AppError::Validation("unit name cannot be empty".to_string()));
        }
        if !names.insert(spec.name.as_str()) {
            return Err(AppError::Validation(format!(
                "duplicate unit name: {}",
                spec.name
            )));
        }
        spec.policy
            .validate()
            .map_err(|e| AppError::Validation(format!("unit '{}': {}", spec.name, e)))?;
    }

    if let ExecutionMode::CriticalFirst { unit, .. } = mode {
        if !names.contains(unit.as_str()) {
            return Err(AppError::Validation(format!(
                "critical unit '{}' is not a configured unit",
                unit
            )));
        }
    }

    Ok(())
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
