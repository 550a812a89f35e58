// Central Error Type for the Application

use crate::domain::CycleId;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    /// Unexpected failure outside a unit's retry scope; ends the cycle, not the service
    #[error("Cycle #{cycle_id} aborted while running '{unit}': {detail}")]
    CycleFatal {
        cycle_id: CycleId,
        unit: String,
        detail: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn is_cycle_fatal(&self) -> bool {
        matches!(self, AppError::CycleFatal { .. })
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
