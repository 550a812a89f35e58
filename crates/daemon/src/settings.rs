//! Layered configuration
//!
//! Sources, lowest to highest precedence:
//! 1. built-in defaults (serde defaults below)
//! 2. TOML file (`--config`, default `cadence.toml` if present)
//! 3. environment variables: `CADENCE_SERVICE__INTERVAL_SECS=60`,
//!    `CADENCE_SERVICE__SCHEDULE="0 */4 * * *"`
//! 4. command line flags (applied by the caller)

use cadence_core::application::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_CYCLE_INTERVAL, DEFAULT_ERROR_BACKOFF,
    DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS,
};
use cadence_core::application::{
    CriticalFailure, CycleSchedule, ExecutionMode, FatalCyclePolicy, RetryCondition, RetryPolicy,
    ServiceConfig,
};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

pub const ENV_PREFIX: &str = "CADENCE";
pub const DEFAULT_CONFIG_FILE: &str = "cadence.toml";
pub const DEFAULT_RETENTION_DAYS: u64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub service: ServiceSettings,
    pub execution: ExecutionSettings,
    pub retry: RetrySettings,
    pub history: HistorySettings,
    pub units: Vec<UnitSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSettings {
    pub interval_secs: u64,
    pub continuous: bool,
    /// Cron expression (UTC); when set it replaces `interval_secs`
    pub schedule: Option<String>,
    pub fatal_policy: FatalCyclePolicy,
    pub error_backoff_secs: u64,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_CYCLE_INTERVAL.as_secs(),
            continuous: true,
            schedule: None,
            fatal_policy: FatalCyclePolicy::default(),
            error_backoff_secs: DEFAULT_ERROR_BACKOFF.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeSetting {
    Sequential,
    #[default]
    Parallel,
    CriticalFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalFailureSetting {
    #[default]
    SkipRemaining,
    Continue,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    pub mode: ModeSetting,
    pub critical_unit: Option<String>,
    pub on_critical_failure: CriticalFailureSetting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOn {
    #[default]
    All,
    Transient,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_secs: f64,
    pub multiplier: f64,
    pub max_delay_secs: Option<f64>,
    pub retry_on: RetryOn,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay_secs: DEFAULT_INITIAL_DELAY.as_secs_f64(),
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay_secs: None,
            retry_on: RetryOn::default(),
        }
    }
}

/// Per-unit retry override; unset fields fall back to `[retry]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOverride {
    pub max_attempts: Option<u32>,
    pub initial_delay_secs: Option<f64>,
    pub multiplier: Option<f64>,
    pub max_delay_secs: Option<f64>,
    pub retry_on: Option<RetryOn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Enables the SQLite report sink and database units
    pub database_url: Option<String>,
    pub retention_days: u64,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            database_url: None,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl HistorySettings {
    /// Database url with a leading `~` in the file path expanded
    pub fn resolved_database_url(&self) -> Option<String> {
        self.database_url.as_deref().map(|url| {
            match url.strip_prefix("sqlite://") {
                Some(path) => format!("sqlite://{}", shellexpand::tilde(path)),
                None => shellexpand::tilde(url).into_owned(),
            }
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Command,
    Sql,
    PruneHistory,
    Simulated,
}

/// One `[[units]]` entry; which fields are required depends on `kind`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSettings {
    pub name: String,
    pub kind: UnitKind,

    // command
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    pub working_dir: Option<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub env_allowlist: Option<Vec<String>>,
    pub timeout_secs: Option<f64>,

    // sql
    pub statement: Option<String>,

    // prune_history
    pub retention_days: Option<u64>,

    // simulated
    pub work_ms: Option<u64>,
    pub fail_first: Option<u32>,

    pub retry: Option<RetryOverride>,
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment
    ///
    /// A missing file is an error only when `required` is set.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        let file = File::from(path).format(FileFormat::Toml).required(required);
        Self::from_sources(Config::builder().add_source(file))
    }

    /// Settings from a TOML string plus the environment
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::from_sources(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn from_sources(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Check everything that can be checked without touching the outside world
    pub fn validate(&self) -> Result<(), String> {
        if self.units.is_empty() {
            return Err("no [[units]] configured".to_string());
        }
        let scheduled = self.service.schedule.is_some();
        if self.service.continuous && !scheduled && self.service.interval_secs == 0 {
            return Err("service.interval_secs must be > 0 in continuous mode".to_string());
        }
        self.service_config()?;

        let mut names = HashSet::new();
        for unit in &self.units {
            if !names.insert(unit.name.as_str()) {
                return Err(format!("duplicate unit name '{}'", unit.name));
            }
            unit.validate(self.history.database_url.is_some())?;
            self.retry_policy(unit)
                .validate()
                .map_err(|e| format!("unit '{}': {}", unit.name, e))?;
        }

        if self.execution.mode == ModeSetting::CriticalFirst {
            match &self.execution.critical_unit {
                None => {
                    return Err(
                        "execution.critical_unit is required for critical_first mode".to_string()
                    )
                }
                Some(name) if !names.contains(name.as_str()) => {
                    return Err(format!(
                        "execution.critical_unit '{}' is not a configured unit",
                        name
                    ))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn service_config(&self) -> Result<ServiceConfig, String> {
        let schedule = self
            .service
            .schedule
            .as_deref()
            .map(CycleSchedule::parse)
            .transpose()
            .map_err(|e| format!("service.schedule: {}", e))?;

        Ok(ServiceConfig {
            interval: Duration::from_secs(self.service.interval_secs),
            continuous: self.service.continuous,
            schedule,
            fatal_policy: self.service.fatal_policy,
            error_backoff: Duration::from_secs(self.service.error_backoff_secs),
        })
    }

    pub fn execution_mode(&self) -> Result<ExecutionMode, String> {
        Ok(match self.execution.mode {
            ModeSetting::Sequential => ExecutionMode::Sequential,
            ModeSetting::Parallel => ExecutionMode::Parallel,
            ModeSetting::CriticalFirst => ExecutionMode::CriticalFirst {
                unit: self.execution.critical_unit.clone().ok_or_else(|| {
                    "execution.critical_unit is required for critical_first mode".to_string()
                })?,
                on_failure: match self.execution.on_critical_failure {
                    CriticalFailureSetting::SkipRemaining => CriticalFailure::SkipRemaining,
                    CriticalFailureSetting::Continue => CriticalFailure::Continue,
                },
            },
        })
    }

    /// `[retry]` defaults merged with the unit's override
    pub fn retry_policy(&self, unit: &UnitSettings) -> RetryPolicy {
        let overrides = unit.retry.clone().unwrap_or_default();
        let initial_delay = overrides
            .initial_delay_secs
            .unwrap_or(self.retry.initial_delay_secs);

        let mut policy = RetryPolicy::new(
            overrides.max_attempts.unwrap_or(self.retry.max_attempts),
            secs(initial_delay),
        )
        .with_multiplier(overrides.multiplier.unwrap_or(self.retry.multiplier));

        if let Some(max_delay) = overrides.max_delay_secs.or(self.retry.max_delay_secs) {
            policy = policy.with_max_delay(secs(max_delay));
        }
        policy
    }

    pub fn retry_condition(&self, unit: &UnitSettings) -> RetryCondition {
        let retry_on = unit
            .retry
            .as_ref()
            .and_then(|r| r.retry_on)
            .unwrap_or(self.retry.retry_on);
        match retry_on {
            RetryOn::All => RetryCondition::Always,
            RetryOn::Transient => RetryCondition::Transient,
        }
    }
}

impl UnitSettings {
    fn validate(&self, has_database: bool) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("unit name cannot be empty".to_string());
        }
        let missing =
            |field: &str| format!("unit '{}' ({:?}) requires '{}'", self.name, self.kind, field);

        match self.kind {
            UnitKind::Command if self.command.is_none() => Err(missing("command")),
            UnitKind::Sql if self.statement.is_none() => Err(missing("statement")),
            UnitKind::Sql | UnitKind::PruneHistory if !has_database => Err(format!(
                "unit '{}' needs history.database_url to be set",
                self.name
            )),
            _ => Ok(()),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(secs)
    }
}

/// Negative or non-finite seconds are treated as zero
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}
