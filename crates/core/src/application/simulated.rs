// Simulated Unit - Placeholder work for demos and dry runs
use crate::port::{ProcessUnit, UnitContext, UnitError};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Sleeps for `work`, failing the first `fail_first` attempts of every cycle
#[derive(Debug, Clone)]
pub struct SimulatedUnit {
    work: Duration,
    fail_first: u32,
}

impl SimulatedUnit {
    pub fn new(work: Duration) -> Self {
        Self {
            work,
            fail_first: 0,
        }
    }

    pub fn failing_first(mut self, attempts: u32) -> Self {
        self.fail_first = attempts;
        self
    }
}

#[async_trait]
impl ProcessUnit for SimulatedUnit {
    async fn run(&self, ctx: &UnitContext) -> Result<(), UnitError> {
        debug!(
            unit = %ctx.unit,
            cycle_id = ctx.cycle_id,
            attempt = ctx.attempt,
            work_ms = u64::try_from(self.work.as_millis()).unwrap_or(u64::MAX),
            "Simulated work"
        );
        sleep(self.work).await;

        if ctx.attempt <= self.fail_first {
            return Err(UnitError::ExternalService {
                service: "simulated".to_string(),
                detail: format!("scripted failure on attempt {}", ctx.attempt),
            });
        }
        Ok(())
    }
}
