// Service Loop - Drives cycles until shutdown
//
// STARTING -> RUNNING -> STOPPING -> STOPPED
//
// A cycle that has started always runs to completion; only the waits between
// cycles are cut short by a shutdown request. With a cron schedule, cycles
// start at the schedule's firing times instead of after a fixed interval.

use crate::application::constants::{DEFAULT_CYCLE_INTERVAL, DEFAULT_ERROR_BACKOFF};
use crate::application::orchestrator::CycleOrchestrator;
use crate::application::schedule::CycleSchedule;
use crate::application::shutdown::ShutdownToken;
use crate::domain::{format_duration, CycleId, CycleReport, CycleStatus, ServiceState};
use crate::error::{AppError, Result};
use crate::port::{ReportSink, SystemTimeProvider, TimeProvider};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Reaction to a cycle-fatal error in continuous mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatalCyclePolicy {
    /// Stop the service and surface the error
    Abort,
    /// Wait `error_backoff`, then start the next cycle
    #[default]
    Resilient,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Wait between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Run cycles until shutdown; false runs exactly one cycle
    pub continuous: bool,
    /// Start cycles at these firing times instead of every `interval`
    pub schedule: Option<CycleSchedule>,
    pub fatal_policy: FatalCyclePolicy,
    pub error_backoff: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CYCLE_INTERVAL,
            continuous: true,
            schedule: None,
            fatal_policy: FatalCyclePolicy::default(),
            error_backoff: DEFAULT_ERROR_BACKOFF,
        }
    }
}

impl ServiceConfig {
    pub fn single_shot() -> Self {
        Self {
            continuous: false,
            ..Self::default()
        }
    }

    pub fn continuous(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Continuous mode driven by a cron schedule
    pub fn scheduled(schedule: CycleSchedule) -> Self {
        Self {
            schedule: Some(schedule),
            ..Self::default()
        }
    }

    pub fn with_fatal_policy(mut self, fatal_policy: FatalCyclePolicy) -> Self {
        self.fatal_policy = fatal_policy;
        self
    }

    pub fn with_error_backoff(mut self, error_backoff: Duration) -> Self {
        self.error_backoff = error_backoff;
        self
    }
}

/// Totals for one service run
#[derive(Debug, Clone, Default)]
pub struct ServiceSummary {
    /// Cycles started
    pub cycles: u64,
    pub succeeded: u64,
    pub degraded: u64,
    pub failed: u64,
    /// Cycles that ended with a cycle-fatal error (no report)
    pub fatal: u64,
    pub last_report: Option<CycleReport>,
    /// Every state the service went through, in order
    pub lifecycle: Vec<ServiceState>,
}

impl ServiceSummary {
    fn record(&mut self, report: &CycleReport) {
        match report.status() {
            CycleStatus::Success => self.succeeded += 1,
            CycleStatus::Degraded => self.degraded += 1,
            CycleStatus::Failed => self.failed += 1,
        }
        self.last_report = Some(report.clone());
    }
}

/// Batch service: runs cycles at an interval (or once) with graceful shutdown
pub struct BatchService {
    orchestrator: CycleOrchestrator,
    config: ServiceConfig,
    sinks: Vec<Arc<dyn ReportSink>>,
    state_tx: watch::Sender<ServiceState>,
    time_provider: Arc<dyn TimeProvider>,
}

impl BatchService {
    pub fn new(
        orchestrator: CycleOrchestrator,
        config: ServiceConfig,
        sinks: Vec<Arc<dyn ReportSink>>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ServiceState::Starting);
        Self {
            orchestrator,
            config,
            sinks,
            state_tx,
            time_provider: Arc::new(SystemTimeProvider),
        }
    }

    /// Clock used to resolve schedule firing times
    pub fn with_time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = time_provider;
        self
    }

    /// Observe lifecycle changes
    pub fn subscribe_state(&self) -> watch::Receiver<ServiceState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> ServiceState {
        *self.state_tx.borrow()
    }

    /// Run until shutdown (continuous) or after one cycle (single-shot)
    ///
    /// Returns `Err` when a cycle-fatal error ends the run: always in
    /// single-shot mode, and with `FatalCyclePolicy::Abort` in continuous
    /// mode. The service is STOPPED on every return path.
    pub async fn run(self, mut shutdown: ShutdownToken) -> Result<ServiceSummary> {
        let mut summary = ServiceSummary {
            lifecycle: vec![self.state()],
            ..ServiceSummary::default()
        };

        info!(
            run_id = %self.orchestrator.run_id(),
            mode = %self.orchestrator.mode(),
            units = ?self.orchestrator.unit_names(),
            continuous = self.config.continuous,
            interval_secs = self.config.interval.as_secs(),
            schedule = ?self.config.schedule.as_ref().map(CycleSchedule::expression),
            "Batch service starting"
        );

        self.advance(ServiceState::Running, &mut summary)?;

        let outcome = self.cycle_loop(&mut shutdown, &mut summary).await;

        if self.state() == ServiceState::Running {
            self.advance(ServiceState::Stopping, &mut summary)?;
        }
        self.advance(ServiceState::Stopped, &mut summary)?;

        info!(
            cycles = summary.cycles,
            succeeded = summary.succeeded,
            degraded = summary.degraded,
            failed = summary.failed,
            fatal = summary.fatal,
            "Batch service stopped"
        );

        outcome.map(|_| summary)
    }

    async fn cycle_loop(
        &self,
        shutdown: &mut ShutdownToken,
        summary: &mut ServiceSummary,
    ) -> Result<()> {
        let mut cycle_id: CycleId = 0;

        if self.config.continuous && self.config.schedule.is_some() {
            match self.regular_wait() {
                Some(wait) => {
                    if !self.pause(wait, shutdown).await {
                        return Ok(());
                    }
                }
                None => return Ok(()),
            }
        }

        loop {
            if shutdown.is_shutdown() {
                info!("Shutdown requested, not starting a new cycle");
                return Ok(());
            }

            cycle_id += 1;
            summary.cycles += 1;

            let cycle = self.orchestrator.run_cycle(cycle_id);
            tokio::pin!(cycle);

            let outcome = tokio::select! {
                outcome = &mut cycle => outcome,
                _ = shutdown.wait() => {
                    info!(
                        cycle_id = cycle_id,
                        "Shutdown requested, waiting for the current cycle to finish"
                    );
                    self.advance(ServiceState::Stopping, summary)?;
                    cycle.await
                }
            };

            let next_wait = match outcome {
                Ok(report) => {
                    summary.record(&report);
                    self.publish(&report).await;
                    if !self.config.continuous {
                        return Ok(());
                    }
                    match self.regular_wait() {
                        Some(wait) => wait,
                        None => return Ok(()),
                    }
                }
                Err(err) => {
                    summary.fatal += 1;
                    error!(cycle_id = cycle_id, error = %err, "Cycle ended with a fatal error");

                    if !self.config.continuous {
                        return Err(err);
                    }
                    if self.config.fatal_policy == FatalCyclePolicy::Abort {
                        error!(
                            cycle_id = cycle_id,
                            "Fatal cycle policy is abort, stopping service"
                        );
                        return Err(err);
                    }
                    self.config.error_backoff
                }
            };

            if !self.state().accepts_new_cycles() {
                return Ok(());
            }

            info!(
                cycle_id = cycle_id,
                wait_secs = next_wait.as_secs(),
                "Next cycle in {}",
                format_duration(next_wait)
            );

            if !self.pause(next_wait, shutdown).await {
                return Ok(());
            }
        }
    }

    /// Wait before the next regular cycle; `None` once the schedule has no future firing
    fn regular_wait(&self) -> Option<Duration> {
        let Some(schedule) = &self.config.schedule else {
            return Some(self.config.interval);
        };
        let wait = schedule.wait_from(self.time_provider.now());
        if wait.is_none() {
            warn!(schedule = %schedule, "Schedule has no future firing, stopping service");
        }
        wait
    }

    /// Sleep unless a stop arrives first; false when stopping
    async fn pause(&self, wait: Duration, shutdown: &mut ShutdownToken) -> bool {
        tokio::select! {
            _ = sleep(wait) => true,
            _ = shutdown.wait() => {
                info!("Shutdown requested during wait between cycles");
                false
            }
        }
    }

    /// Hand a finalized report to every sink; failures are logged only
    async fn publish(&self, report: &CycleReport) {
        for sink in &self.sinks {
            if let Err(e) = sink.record(report).await {
                warn!(
                    sink = sink.name(),
                    cycle_id = report.cycle_id(),
                    error = %e,
                    "Failed to record cycle report"
                );
            }
        }
    }

    fn advance(&self, next: ServiceState, summary: &mut ServiceSummary) -> Result<()> {
        let current = self.state();
        let next = current.transition(next).map_err(AppError::from)?;
        self.state_tx.send_replace(next);
        summary.lifecycle.push(next);
        info!(from = %current, to = %next, "Service state changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::orchestrator::{ExecutionMode, UnitSpec};
    use crate::application::retry::RetryPolicy;
    use crate::application::shutdown::shutdown_channel;
    use crate::domain::ProcessStatus;
    use crate::port::process_unit::mocks::{ScriptedUnit, Step};
    use crate::port::report_sink::mocks::{CollectingSink, FailingSink};
    use chrono::{DateTime, TimeZone, Utc};
    use tokio::time::Instant;
    use tokio_test::assert_ok;

    const LIFECYCLE: [ServiceState; 4] = [
        ServiceState::Starting,
        ServiceState::Running,
        ServiceState::Stopping,
        ServiceState::Stopped,
    ];

    fn spec(name: &str, unit: Arc<ScriptedUnit>) -> UnitSpec {
        UnitSpec::new(name, unit)
            .with_policy(RetryPolicy::new(3, Duration::from_secs(1)).with_multiplier(2.0))
    }

    fn orchestrator(units: Vec<UnitSpec>) -> CycleOrchestrator {
        CycleOrchestrator::new(units, ExecutionMode::Parallel).unwrap()
    }

    /// Wall clock that follows tokio's (paused) clock from a fixed origin
    struct TokioClock {
        origin: DateTime<Utc>,
        start: Instant,
    }

    impl TokioClock {
        fn starting_at(origin: DateTime<Utc>) -> Arc<Self> {
            Arc::new(Self {
                origin,
                start: Instant::now(),
            })
        }
    }

    impl TimeProvider for TokioClock {
        fn now(&self) -> DateTime<Utc> {
            self.origin + chrono::Duration::from_std(self.start.elapsed()).unwrap()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_shot_with_flaky_unit() {
        let a = Arc::new(ScriptedUnit::succeeding());
        let b = Arc::new(ScriptedUnit::flaky(2));
        let sink = Arc::new(CollectingSink::new());

        let service = BatchService::new(
            orchestrator(vec![spec("A", a.clone()), spec("B", b.clone())]),
            ServiceConfig::single_shot(),
            vec![sink.clone()],
        );
        let (_tx, token) = shutdown_channel();

        let start = Instant::now();
        let summary = service.run(token).await.unwrap();

        // 1s + 2s of backoff and no sleep after the single cycle
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(summary.lifecycle, LIFECYCLE.to_vec());
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.succeeded, 1);

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.cycle_id(), 1);
        assert_eq!(report.status(), CycleStatus::Success);
        assert_eq!(report.result_for("A").unwrap().attempts(), 1);
        assert_eq!(report.result_for("B").unwrap().attempts(), 3);
        assert_eq!(
            report.result_for("B").unwrap().status(),
            ProcessStatus::Success
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_before_first_cycle_runs_nothing() {
        let unit = Arc::new(ScriptedUnit::succeeding());
        let service = BatchService::new(
            orchestrator(vec![spec("A", unit.clone())]),
            ServiceConfig::default(),
            vec![],
        );
        let (tx, token) = shutdown_channel();
        tx.shutdown();

        let summary = service.run(token).await.unwrap();

        assert_eq!(summary.cycles, 0);
        assert_eq!(unit.call_count(), 0);
        assert_eq!(summary.lifecycle, LIFECYCLE.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_continuous_runs_cycles_at_interval() {
        let (sink, mut reports) = CollectingSink::with_channel();
        let service = BatchService::new(
            orchestrator(vec![spec("A", Arc::new(ScriptedUnit::succeeding()))]),
            ServiceConfig::continuous(Duration::from_secs(60)),
            vec![Arc::new(sink)],
        );
        let (tx, token) = shutdown_channel();
        let start = Instant::now();

        let driver = async {
            let mut seen = Vec::new();
            for _ in 0..3 {
                seen.push(reports.recv().await.unwrap().cycle_id());
            }
            tx.shutdown();
            seen
        };

        let (summary, seen) = tokio::join!(service.run(token), driver);
        let summary = summary.unwrap();

        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(summary.cycles, 3);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_sleep_is_prompt() {
        let (sink, mut reports) = CollectingSink::with_channel();
        let service = BatchService::new(
            orchestrator(vec![spec("A", Arc::new(ScriptedUnit::succeeding()))]),
            ServiceConfig::continuous(Duration::from_secs(3600)),
            vec![Arc::new(sink)],
        );
        let (tx, token) = shutdown_channel();
        let start = Instant::now();

        let driver = async {
            reports.recv().await.unwrap();
            sleep(Duration::from_secs(10)).await;
            tx.shutdown();
        };

        let (summary, _) = tokio::join!(service.run(token), driver);
        let summary = summary.unwrap();

        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.lifecycle, LIFECYCLE.to_vec());
        // Not the full hour
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_mid_cycle_lets_cycle_finish() {
        let slow = Arc::new(ScriptedUnit::new(vec![Step::Succeed(Duration::from_secs(5))]));
        let sink = Arc::new(CollectingSink::new());
        let service = BatchService::new(
            orchestrator(vec![spec("slow", slow.clone())]),
            ServiceConfig::continuous(Duration::from_secs(3600)),
            vec![sink.clone()],
        );
        let mut states = service.subscribe_state();
        let (tx, token) = shutdown_channel();
        let start = Instant::now();

        let driver = async {
            sleep(Duration::from_secs(1)).await;
            tx.shutdown();
            assert_ok!(states.wait_for(|s| *s == ServiceState::Stopping).await);
            // Cycle still in flight
            assert!(sink.reports().is_empty());
        };

        let (summary, _) = tokio::join!(service.run(token), driver);
        let summary = summary.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(summary.cycles, 1);
        assert_eq!(slow.call_count(), 1);
        assert_eq!(sink.reports().len(), 1);
        assert_eq!(summary.lifecycle, LIFECYCLE.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_policy_stops_on_fatal_cycle() {
        let service = BatchService::new(
            orchestrator(vec![spec("bug", Arc::new(ScriptedUnit::panicking("boom")))]),
            ServiceConfig::continuous(Duration::from_secs(60))
                .with_fatal_policy(FatalCyclePolicy::Abort),
            vec![],
        );
        let states = service.subscribe_state();
        let (_tx, token) = shutdown_channel();

        let err = service.run(token).await.unwrap_err();

        assert!(err.is_cycle_fatal());
        assert_eq!(*states.borrow(), ServiceState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resilient_policy_backs_off_and_continues() {
        let unit = Arc::new(ScriptedUnit::new(vec![
            Step::Panic("first cycle bug".to_string()),
            Step::Succeed(Duration::ZERO),
        ]));
        let (sink, mut reports) = CollectingSink::with_channel();
        let service = BatchService::new(
            orchestrator(vec![spec("A", unit)]),
            ServiceConfig::continuous(Duration::from_secs(3600))
                .with_error_backoff(Duration::from_secs(300)),
            vec![Arc::new(sink)],
        );
        let (tx, token) = shutdown_channel();
        let start = Instant::now();

        let driver = async {
            let report = reports.recv().await.unwrap();
            tx.shutdown();
            report
        };

        let (summary, report) = tokio::join!(service.run(token), driver);
        let summary = summary.unwrap();

        assert_eq!(report.cycle_id(), 2);
        assert_eq!(summary.cycles, 2);
        assert_eq!(summary.fatal, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(start.elapsed(), Duration::from_secs(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_shot_fatal_cycle_is_an_error() {
        let service = BatchService::new(
            orchestrator(vec![spec("bug", Arc::new(ScriptedUnit::panicking("boom")))]),
            ServiceConfig::single_shot().with_fatal_policy(FatalCyclePolicy::Resilient),
            vec![],
        );
        let states = service.subscribe_state();
        let (_tx, token) = shutdown_channel();

        assert!(service.run(token).await.is_err());
        assert_eq!(*states.borrow(), ServiceState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_is_not_fatal() {
        let collecting = Arc::new(CollectingSink::new());
        let service = BatchService::new(
            orchestrator(vec![spec("A", Arc::new(ScriptedUnit::succeeding()))]),
            ServiceConfig::single_shot(),
            vec![Arc::new(FailingSink), collecting.clone()],
        );
        let (_tx, token) = shutdown_channel();

        let summary = service.run(token).await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(collecting.reports().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_is_counted_not_fatal() {
        let service = BatchService::new(
            orchestrator(vec![spec(
                "A",
                Arc::new(ScriptedUnit::failing(crate::port::UnitError::Database(
                    "locked".to_string(),
                ))),
            )]),
            ServiceConfig::single_shot(),
            vec![],
        );
        let (_tx, token) = shutdown_channel();

        let summary = service.run(token).await.unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(
            summary.last_report.unwrap().status(),
            CycleStatus::Failed
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_cycle_while_stopping_still_reaches_stopped() {
        // Attempt 1 fails, the retry at 1s panics; stop arrives in between
        let unit = Arc::new(ScriptedUnit::new(vec![
            Step::Fail(
                Duration::ZERO,
                crate::port::UnitError::Io("reset".to_string()),
            ),
            Step::Panic("state corrupted".to_string()),
        ]));
        let service = BatchService::new(
            orchestrator(vec![spec("A", unit.clone())]),
            ServiceConfig::continuous(Duration::from_secs(3600)),
            vec![Arc::new(FailingSink)],
        );
        let states = service.subscribe_state();
        let (tx, token) = shutdown_channel();

        let driver = async {
            sleep(Duration::from_millis(500)).await;
            tx.shutdown();
        };

        let (result, _) = tokio::join!(service.run(token), driver);
        let summary = assert_ok!(result);

        assert_eq!(unit.call_count(), 2);
        assert_eq!(summary.cycles, 1);
        assert_eq!(summary.fatal, 1);
        assert_eq!(summary.lifecycle, LIFECYCLE.to_vec());
        assert_eq!(*states.borrow(), ServiceState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_while_stopping_still_reaches_stopped() {
        let slow = Arc::new(ScriptedUnit::new(vec![Step::Succeed(Duration::from_secs(2))]));
        let service = BatchService::new(
            orchestrator(vec![spec("slow", slow)]),
            ServiceConfig::continuous(Duration::from_secs(3600)),
            vec![Arc::new(FailingSink)],
        );
        let (tx, token) = shutdown_channel();

        let driver = async {
            sleep(Duration::from_secs(1)).await;
            tx.shutdown();
        };

        let (result, _) = tokio::join!(service.run(token), driver);
        let summary = assert_ok!(result);

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.lifecycle, LIFECYCLE.to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn test_schedule_drives_cycle_start_times() {
        // 00:03 now, every 10 minutes -> cycles at 00:10 and 00:20
        let origin = Utc.with_ymd_and_hms(2026, 1, 5, 0, 3, 0).unwrap();
        let clock = TokioClock::starting_at(origin);
        let schedule = CycleSchedule::parse("*/10 * * * *").unwrap();

        let (sink, mut reports) = CollectingSink::with_channel();
        let service = BatchService::new(
            orchestrator(vec![spec("A", Arc::new(ScriptedUnit::succeeding()))])
                .with_time_provider(clock.clone()),
            ServiceConfig::scheduled(schedule),
            vec![Arc::new(sink)],
        )
        .with_time_provider(clock);
        let (tx, token) = shutdown_channel();
        let start = Instant::now();

        let driver = async {
            let mut started = Vec::new();
            for _ in 0..2 {
                started.push(reports.recv().await.unwrap().started_at());
            }
            tx.shutdown();
            started
        };

        let (summary, started) = tokio::join!(service.run(token), driver);
        let summary = summary.unwrap();

        assert_eq!(
            started,
            vec![
                Utc.with_ymd_and_hms(2026, 1, 5, 0, 10, 0).unwrap(),
                Utc.with_ymd_and_hms(2026, 1, 5, 0, 20, 0).unwrap(),
            ]
        );
        assert_eq!(summary.cycles, 2);
        assert_eq!(start.elapsed(), Duration::from_secs(17 * 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_before_first_scheduled_firing() {
        let clock = TokioClock::starting_at(Utc.with_ymd_and_hms(2026, 1, 5, 1, 0, 0).unwrap());
        let unit = Arc::new(ScriptedUnit::succeeding());
        let service = BatchService::new(
            orchestrator(vec![spec("A", unit.clone())]),
            ServiceConfig::scheduled(CycleSchedule::parse("0 3 * * *").unwrap()),
            vec![],
        )
        .with_time_provider(clock);
        let (tx, token) = shutdown_channel();
        let start = Instant::now();

        let driver = async {
            sleep(Duration::from_secs(60)).await;
            tx.shutdown();
        };

        let (summary, _) = tokio::join!(service.run(token), driver);
        let summary = summary.unwrap();

        assert_eq!(summary.cycles, 0);
        assert_eq!(unit.call_count(), 0);
        assert_eq!(summary.lifecycle, LIFECYCLE.to_vec());
        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_shot_runs_immediately_despite_schedule() {
        let clock = TokioClock::starting_at(Utc.with_ymd_and_hms(2026, 1, 5, 1, 0, 0).unwrap());
        let config = ServiceConfig {
            continuous: false,
            ..ServiceConfig::scheduled(CycleSchedule::parse("0 3 * * *").unwrap())
        };
        let service = BatchService::new(
            orchestrator(vec![spec("A", Arc::new(ScriptedUnit::succeeding()))]),
            config,
            vec![],
        )
        .with_time_provider(clock);
        let (_tx, token) = shutdown_channel();
        let start = Instant::now();

        let summary = service.run(token).await.unwrap();

        assert_eq!(summary.cycles, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
