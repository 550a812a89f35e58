// Process Unit Port
// One independent piece of batch work (sync, report, cleanup, ...)

use crate::domain::CycleId;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Per-attempt execution context handed to a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitContext {
    pub cycle_id: CycleId,
    pub unit: String,
    /// 1-based attempt number within the current cycle
    pub attempt: u32,
}

impl UnitContext {
    pub fn new(cycle_id: CycleId, unit: impl Into<String>, attempt: u32) -> Self {
        Self {
            cycle_id,
            unit: unit.into(),
            attempt,
        }
    }
}

/// Errors a unit reports back to the retry helper
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("External service '{service}' failed: {detail}")]
    ExternalService { service: String, detail: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error(
        "Command exited with status {}: {}",
        .code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
        .stderr
    )]
    Command { code: Option<i32>, stderr: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(String),

    #[error("{0}")]
    Other(String),
}

impl UnitError {
    /// Whether another attempt could plausibly succeed
    ///
    /// Bad input and bad configuration fail the same way every time.
    pub fn is_transient(&self) -> bool {
        !matches!(self, UnitError::Validation(_) | UnitError::Configuration(_))
    }

    /// Stable category name for logs and storage
    pub fn kind(&self) -> &'static str {
        match self {
            UnitError::Validation(_) => "validation",
            UnitError::Configuration(_) => "configuration",
            UnitError::ExternalService { .. } => "external_service",
            UnitError::Database(_) => "database",
            UnitError::Command { .. } => "command",
            UnitError::Timeout(_) => "timeout",
            UnitError::Io(_) => "io",
            UnitError::Other(_) => "other",
        }
    }
}

impl From<std::io::Error> for UnitError {
    fn from(err: std::io::Error) -> Self {
        UnitError::Io(err.to_string())
    }
}

/// Process Unit trait
///
/// A unit signals success by returning `Ok(())` and failure by returning a
/// `UnitError`. Units must not share mutable state with their siblings: any
/// shared resource (a connection pool, a client) is acquired per attempt and
/// released on every exit path.
///
/// Implementations:
/// - SimulatedUnit: sleeps, optionally failing the first attempts (core)
/// - CommandUnit: runs an external program (infra-system)
/// - SqlStatementUnit / PruneHistoryUnit: database work (infra-sqlite)
#[async_trait]
pub trait ProcessUnit: Send + Sync {
    /// Run one attempt of the unit
    async fn run(&self, ctx: &UnitContext) -> Result<(), UnitError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Scripted behavior of a single attempt
    #[derive(Debug, Clone)]
    pub enum Step {
        /// Succeed after the given work time
        Succeed(Duration),
        /// Fail with the given error after the given work time
        Fail(Duration, UnitError),
        /// Panic with message (for cycle-fatal testing)
        Panic(String),
    }

    /// Mock unit that replays a script of attempt outcomes
    ///
    /// The last step repeats once the script is exhausted.
    pub struct ScriptedUnit {
        steps: Vec<Step>,
        calls: AtomicU32,
        seen: Mutex<Vec<UnitContext>>,
    }

    impl ScriptedUnit {
        pub fn new(steps: Vec<Step>) -> Self {
            Self {
                steps,
                calls: AtomicU32::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub fn succeeding() -> Self {
            Self::new(vec![Step::Succeed(Duration::ZERO)])
        }

        pub fn failing(error: UnitError) -> Self {
            Self::new(vec![Step::Fail(Duration::ZERO, error)])
        }

        /// Fail `failures` times, then succeed
        pub fn flaky(failures: u32) -> Self {
            let mut steps: Vec<Step> = (0..failures)
                .map(|n| {
                    Step::Fail(
                        Duration::ZERO,
                        UnitError::Other(format!("transient failure #{}", n + 1)),
                    )
                })
                .collect();
            steps.push(Step::Succeed(Duration::ZERO));
            Self::new(steps)
        }

        pub fn panicking(message: impl Into<String>) -> Self {
            Self::new(vec![Step::Panic(message.into())])
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }

        /// Contexts received so far, in call order
        pub fn contexts(&self) -> Vec<UnitContext> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ProcessUnit for ScriptedUnit {
        async fn run(&self, ctx: &UnitContext) -> Result<(), UnitError> {
            let index = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
            self.seen.lock().unwrap().push(ctx.clone());

            let step = self
                .steps
                .get(index)
                .or_else(|| self.steps.last())
                .cloned()
                .unwrap_or(Step::Succeed(Duration::ZERO));

            match step {
                Step::Succeed(work) => {
                    tokio::time::sleep(work).await;
                    Ok(())
                }
                Step::Fail(work, err) => {
                    tokio::time::sleep(work).await;
                    Err(err)
                }
                Step::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for cycle-fatal testing
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(!UnitError::Validation("bad rut".into()).is_transient());
        assert!(!UnitError::Configuration("missing url".into()).is_transient());
        assert!(UnitError::Database("locked".into()).is_transient());
        assert!(UnitError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(UnitError::ExternalService {
            service: "sftp".into(),
            detail: "connection reset".into()
        }
        .is_transient());
    }

    #[test]
    fn test_command_error_message() {
        let err = UnitError::Command {
            code: Some(3),
            stderr: "disk full".into(),
        };
        assert_eq!(err.to_string(), "Command exited with status 3: disk full");
        assert_eq!(err.kind(), "command");

        let err = UnitError::Command {
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[tokio::test]
    async fn test_scripted_unit_repeats_last_step() {
        let unit = mocks::ScriptedUnit::flaky(1);
        let ctx = UnitContext::new(1, "flaky", 1);

        assert!(unit.run(&ctx).await.is_err());
        assert!(unit.run(&ctx).await.is_ok());
        assert!(unit.run(&ctx).await.is_ok());
        assert_eq!(unit.call_count(), 3);
        assert_eq!(unit.contexts().len(), 3);
    }
}
