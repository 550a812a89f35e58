//! End-to-end: external command units inside a cycle
#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use cadence_core::application::{
    shutdown_channel, BatchService, CycleOrchestrator, ExecutionMode, ServiceConfig,
};
use cadence_core::domain::{CycleStatus, ProcessStatus};
use cadence_infra_sqlite::{SqliteHistory, SqliteReportSink};
use cadence_infra_system::CommandUnit;
use cadence_integration_tests::{history_db, quick_spec};
use tokio_test::assert_ok;

fn sh(script: &str) -> CommandUnit {
    CommandUnit::new("/bin/sh").args(["-c", script])
}

/// Flaky command (fails until a marker exists), a broken command and a hung command
#[tokio::test]
async fn test_command_units_in_one_cycle() {
    let (_db_dir, pool) = history_db().await;
    let work = tempfile::tempdir().unwrap();

    let flaky = sh("if [ -f marker ]; then exit 0; else touch marker; exit 3; fi")
        .working_dir(work.path());
    let broken = sh("echo 'disk full' >&2; exit 7");
    let hung = sh("sleep 30").timeout(Duration::from_millis(200));

    let units = vec![
        quick_spec("flaky", Arc::new(flaky), 3),
        quick_spec("broken", Arc::new(broken), 2),
        quick_spec("hung", Arc::new(hung), 1),
    ];
    let orchestrator = CycleOrchestrator::new(units, ExecutionMode::Parallel).unwrap();
    let service = BatchService::new(
        orchestrator,
        ServiceConfig::single_shot(),
        vec![Arc::new(SqliteReportSink::new(pool.clone()))],
    );
    let (_tx, token) = shutdown_channel();

    let summary = assert_ok!(service.run(token).await);
    assert_eq!(summary.degraded, 1);

    let stored = SqliteHistory::new(pool).recent(1).await.unwrap();
    let report = &stored[0];
    assert_eq!(report.status(), CycleStatus::Degraded);
    assert_eq!(report.count(ProcessStatus::Success), 1);

    let flaky = report.result_for("flaky").unwrap();
    assert!(flaky.is_success());
    assert_eq!(flaky.attempts(), 2);
    assert!(work.path().join("marker").exists());

    let broken = report.result_for("broken").unwrap();
    assert_eq!(broken.status(), ProcessStatus::Failed);
    assert_eq!(broken.attempts(), 2);
    let message = broken.error().unwrap();
    assert!(message.contains("status 7"), "{}", message);
    assert!(message.contains("disk full"), "{}", message);

    let hung = report.result_for("hung").unwrap();
    assert_eq!(hung.status(), ProcessStatus::Failed);
    assert!(hung.error().unwrap().starts_with("Timed out"));
    assert!(hung.duration() < Duration::from_secs(5));
}

/// Sequential mode: children see the cycle context in their environment
#[tokio::test]
async fn test_command_receives_cycle_context() {
    let work = tempfile::tempdir().unwrap();
    let out = work.path().join("ctx.txt");
    let script = format!(
        "echo \"$CADENCE_UNIT $CADENCE_CYCLE_ID $CADENCE_ATTEMPT\" > '{}'",
        out.display()
    );

    let orchestrator = CycleOrchestrator::new(
        vec![quick_spec("export", Arc::new(sh(&script)), 1)],
        ExecutionMode::Sequential,
    )
    .unwrap();
    let service = BatchService::new(orchestrator, ServiceConfig::single_shot(), Vec::new());
    let (_tx, token) = shutdown_channel();

    let summary = assert_ok!(service.run(token).await);
    assert_eq!(summary.succeeded, 1);

    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.trim(), "export 1 1");
}
