// Port Layer - Interfaces for external collaborators

pub mod process_unit;
pub mod report_sink;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use process_unit::{ProcessUnit, UnitContext, UnitError};
pub use report_sink::ReportSink;
pub use time_provider::{SystemTimeProvider, TimeProvider};
