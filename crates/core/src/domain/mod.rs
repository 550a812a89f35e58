// Domain Layer - Cycle reports and service lifecycle

pub mod error;
pub mod report;
pub mod state;

// Re-exports
pub use error::DomainError;
pub use report::{
    format_duration, CycleId, CycleReport, CycleReportBuilder, CycleStatus, ProcessResult,
    ProcessStatus,
};
pub use state::ServiceState;
