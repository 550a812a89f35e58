// Retry helper with exponential backoff
use crate::application::constants::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS,
};
use crate::domain::DomainError;
use crate::port::UnitError;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Retry policy for one unit
///
/// Delay before attempt `k + 1` (after attempt `k` failed):
/// `initial_delay * multiplier^(k - 1)`, capped at `max_delay` when set.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (>= 1)
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Example
    /// ```text
    /// let policy = RetryPolicy::new(3, Duration::from_secs(1))
    ///     .with_max_delay(Duration::from_secs(30));
    /// ```
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay,
            ..Self::default()
        }
    }

    /// Single attempt, no retry
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.max_attempts == 0 {
            return Err(DomainError::ValidationError(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(DomainError::ValidationError(format!(
                "backoff multiplier must be a finite number >= 1.0 (got {})",
                self.multiplier
            )));
        }
        Ok(())
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let mut secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if let Some(max_delay) = self.max_delay {
            secs = secs.min(max_delay.as_secs_f64());
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Sum of the delays incurred by the first `failed_attempts` failures
    pub fn total_backoff(&self, failed_attempts: u32) -> Duration {
        (1..=failed_attempts)
            .map(|attempt| self.delay_after(attempt))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Predicate deciding which unit errors are worth another attempt
#[derive(Clone, Default)]
pub enum RetryCondition {
    /// Every error is retried
    #[default]
    Always,
    /// Only errors classified as transient (see `UnitError::is_transient`)
    Transient,
    Custom(Arc<dyn Fn(&UnitError) -> bool + Send + Sync>),
}

impl RetryCondition {
    pub fn custom(predicate: impl Fn(&UnitError) -> bool + Send + Sync + 'static) -> Self {
        RetryCondition::Custom(Arc::new(predicate))
    }

    pub fn allows(&self, err: &UnitError) -> bool {
        match self {
            RetryCondition::Always => true,
            RetryCondition::Transient => err.is_transient(),
            RetryCondition::Custom(predicate) => predicate(err),
        }
    }
}

impl fmt::Debug for RetryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryCondition::Always => write!(f, "Always"),
            RetryCondition::Transient => write!(f, "Transient"),
            RetryCondition::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// Successful outcome of a retried operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
    /// Total time spent sleeping between attempts
    pub backoff: Duration,
}

/// Terminal failure: attempts exhausted or the error was not retryable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{unit} failed after {attempts} attempt(s): {source}")]
pub struct RetryError {
    pub unit: String,
    pub attempts: u32,
    pub backoff: Duration,
    /// False when the retry condition rejected the last error
    pub retryable: bool,
    #[source]
    pub source: UnitError,
}

/// Run `op` until it succeeds, the attempts run out, or an error is not retryable
///
/// `op` receives the 1-based attempt number. One log record is emitted per
/// failed attempt and one for the final outcome.
///
/// # Example
/// ```text
/// let done = retry_with_backoff("sync", &policy, &RetryCondition::Always, |attempt| async move {
///     sync_once(attempt).await
/// }).await?;
/// ```
pub async fn retry_with_backoff<T, F, Fut>(
    name: &str,
    policy: &RetryPolicy,
    condition: &RetryCondition,
    mut op: F,
) -> Result<Retried<T>, RetryError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, UnitError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut backoff = Duration::ZERO;
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => {
                info!(
                    unit = %name,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    "Unit completed successfully"
                );
                return Ok(Retried {
                    value,
                    attempts: attempt,
                    backoff,
                });
            }
            Err(err) => {
                let retryable = condition.allows(&err);

                if !retryable || attempt >= max_attempts {
                    error!(
                        unit = %name,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        retryable = retryable,
                        error_kind = err.kind(),
                        error = %err,
                        "Unit failed permanently"
                    );
                    return Err(RetryError {
                        unit: name.to_string(),
                        attempts: attempt,
                        backoff,
                        retryable,
                        source: err,
                    });
                }

                let delay = policy.delay_after(attempt);
                warn!(
                    unit = %name,
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error_kind = err.kind(),
                    error = %err,
                    "Unit attempt failed, retrying after backoff"
                );

                sleep(delay).await;
                backoff = backoff.saturating_add(delay);
                attempt += 1;
            }
        }
    }
}
