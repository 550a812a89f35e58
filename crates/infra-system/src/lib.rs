// Cadence Infrastructure - System Adapters
// Implements: ProcessUnit for external commands

pub mod command_unit;

pub use command_unit::{CommandUnit, DEFAULT_ENV_ALLOWLIST};
