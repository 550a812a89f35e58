//! Process unit factory: `[[units]]` entries -> `UnitSpec`s

use crate::settings::{Settings, UnitKind, UnitSettings};
use anyhow::{anyhow, Context, Result};
use cadence_core::application::{SimulatedUnit, UnitSpec};
use cadence_core::port::{ProcessUnit, TimeProvider};
use cadence_infra_sqlite::{PruneHistoryUnit, SqlStatementUnit, SqliteHistory};
use cadence_infra_system::CommandUnit;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Build every configured unit, in configuration order
pub fn build_units(
    settings: &Settings,
    pool: Option<&SqlitePool>,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<Vec<UnitSpec>> {
    settings
        .units
        .iter()
        .map(|unit| {
            let process = build_unit(settings, unit, pool, time_provider.clone())
                .with_context(|| format!("failed to build unit '{}'", unit.name))?;
            Ok(UnitSpec::new(unit.name.clone(), process)
                .with_policy(settings.retry_policy(unit))
                .retry_if(settings.retry_condition(unit)))
        })
        .collect()
}

fn build_unit(
    settings: &Settings,
    unit: &UnitSettings,
    pool: Option<&SqlitePool>,
    time_provider: Arc<dyn TimeProvider>,
) -> Result<Arc<dyn ProcessUnit>> {
    let process: Arc<dyn ProcessUnit> = match unit.kind {
        UnitKind::Command => {
            let program = unit
                .command
                .as_deref()
                .ok_or_else(|| anyhow!("'command' is required"))?;
            let mut command = CommandUnit::new(shellexpand::tilde(program).into_owned())
                .args(unit.args.iter().cloned());
            for (key, value) in &unit.env {
                command = command.env(key.clone(), value.clone());
            }
            if let Some(allowlist) = &unit.env_allowlist {
                command = command.env_allowlist(allowlist.iter().cloned());
            }
            if let Some(dir) = &unit.working_dir {
                command = command.working_dir(shellexpand::tilde(dir).into_owned());
            }
            if let Some(limit) = unit.timeout() {
                command = command.timeout(limit);
            }
            Arc::new(command)
        }
        UnitKind::Sql => {
            let statement = unit
                .statement
                .as_deref()
                .ok_or_else(|| anyhow!("'statement' is required"))?;
            Arc::new(SqlStatementUnit::new(require_pool(pool)?.clone(), statement))
        }
        UnitKind::PruneHistory => {
            let days = unit
                .retention_days
                .unwrap_or(settings.history.retention_days);
            Arc::new(PruneHistoryUnit::new(
                SqliteHistory::new(require_pool(pool)?.clone()),
                Duration::from_secs(days.saturating_mul(SECS_PER_DAY)),
                time_provider,
            ))
        }
        UnitKind::Simulated => Arc::new(
            SimulatedUnit::new(Duration::from_millis(unit.work_ms.unwrap_or(0)))
                .failing_first(unit.fail_first.unwrap_or(0)),
        ),
    };
    Ok(process)
}

fn require_pool(pool: Option<&SqlitePool>) -> Result<&SqlitePool> {
    pool.ok_or_else(|| anyhow!("history.database_url must be set for database units"))
}
