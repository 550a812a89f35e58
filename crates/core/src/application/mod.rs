// Application Layer - Retry, cycle orchestration and the service loop

pub mod constants;
pub mod orchestrator;
mod panic_guard;
pub mod retry;
pub mod schedule;
pub mod service;
pub mod shutdown;
pub mod simulated;

// Re-exports
pub use orchestrator::{CriticalFailure, CycleOrchestrator, ExecutionMode, UnitSpec};
pub use retry::{retry_with_backoff, Retried, RetryCondition, RetryError, RetryPolicy};
pub use schedule::CycleSchedule;
pub use service::{BatchService, FatalCyclePolicy, ServiceConfig, ServiceSummary};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use simulated::SimulatedUnit;
