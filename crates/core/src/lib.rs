// Cadence Core - Domain Logic & Ports
// NO infrastructure dependencies: units and report sinks are ports

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{AppError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
