// Service constants (No magic values)
use std::time::Duration;

/// Default attempts per unit and cycle (3 = 1 try + 2 retries)
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry (5s, then 10s, 20s, ...)
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(5);

/// Default growth factor between consecutive retry delays
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Default interval between cycles in continuous mode (60 minutes)
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Default wait after a cycle-fatal error before the next cycle (5 minutes)
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5 * 60);
