// Report Sink Port
// Receives each finalized CycleReport (history store, notifications, ...)

use crate::domain::CycleReport;
use crate::error::Result;
use async_trait::async_trait;

/// Destination for finalized cycle reports
///
/// Sink failures are logged by the service loop and never abort it.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Record a finalized report
    async fn record(&self, report: &CycleReport) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Keeps every report in memory; optionally notifies a channel
    #[derive(Default)]
    pub struct CollectingSink {
        reports: Mutex<Vec<CycleReport>>,
        notify: Option<mpsc::UnboundedSender<CycleReport>>,
    }

    impl CollectingSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sink plus a receiver that yields each report as it is recorded
        pub fn with_channel() -> (Self, mpsc::UnboundedReceiver<CycleReport>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Self {
                    reports: Mutex::new(Vec::new()),
                    notify: Some(tx),
                },
                rx,
            )
        }

        pub fn reports(&self) -> Vec<CycleReport> {
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReportSink for CollectingSink {
        fn name(&self) -> &str {
            "collecting"
        }

        async fn record(&self, report: &CycleReport) -> Result<()> {
            self.reports.lock().unwrap().push(report.clone());
            if let Some(tx) = &self.notify {
                let _ = tx.send(report.clone());
            }
            Ok(())
        }
    }

    /// Always fails to record
    pub struct FailingSink;

    #[async_trait]
    impl ReportSink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }

        async fn record(&self, _report: &CycleReport) -> Result<()> {
            Err(AppError::Database("history store unavailable".to_string()))
        }
    }
}
