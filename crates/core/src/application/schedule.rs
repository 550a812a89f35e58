// Cycle Schedule - Cron-driven start times for continuous mode
use crate::error::{AppError, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Cron expression deciding when cycles start
///
/// Accepts the classic five fields (`min hour day month weekday`) or the
/// six/seven field form with seconds (and year) in front. Times are UTC.
///
/// # Example
/// ```text
/// "0 3 * * *"            daily at 03:00
/// "30 6 * * Mon,Wed,Fri" Monday, Wednesday and Friday at 06:30
/// "0 */4 * * *"          every 4 hours on the hour
/// ```
#[derive(Clone)]
pub struct CycleSchedule {
    expression: String,
    schedule: Schedule,
}

impl CycleSchedule {
    pub fn parse(expression: &str) -> Result<Self> {
        let expression = expression.trim();
        let normalized = match expression.split_whitespace().count() {
            5 => format!("0 {}", expression),
            6 | 7 => expression.to_string(),
            n => {
                return Err(AppError::Config(format!(
                    "schedule '{}' has {} fields, expected 5 to 7",
                    expression, n
                )))
            }
        };

        let schedule = Schedule::from_str(&normalized).map_err(|e| {
            AppError::Config(format!("invalid schedule '{}': {}", expression, e))
        })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First firing strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&now).next()
    }

    /// Time from `now` until the next firing; `None` once the schedule is exhausted
    pub fn wait_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let next = self.next_after(now)?;
        Some((next - now).to_std().unwrap_or(Duration::ZERO))
    }
}

impl PartialEq for CycleSchedule {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl fmt::Debug for CycleSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CycleSchedule").field(&self.expression).finish()
    }
}

impl fmt::Display for CycleSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_five_field_expression() {
        let schedule = CycleSchedule::parse("0 */4 * * *").unwrap();

        assert_eq!(schedule.expression(), "0 */4 * * *");
        assert_eq!(
            schedule.next_after(at(2026, 3, 2, 9, 15)),
            Some(at(2026, 3, 2, 12, 0))
        );
        assert_eq!(
            schedule.wait_from(at(2026, 3, 2, 11, 30)),
            Some(Duration::from_secs(30 * 60))
        );
    }

    #[test]
    fn test_next_firing_is_strictly_after_now() {
        let schedule = CycleSchedule::parse("0 3 * * *").unwrap();
        assert_eq!(
            schedule.next_after(at(2026, 3, 2, 3, 0)),
            Some(at(2026, 3, 3, 3, 0))
        );
    }

    #[test]
    fn test_specific_weekdays() {
        // 2026-03-03 is a Tuesday
        let schedule = CycleSchedule::parse("30 6 * * Mon,Wed,Fri").unwrap();
        assert_eq!(
            schedule.next_after(at(2026, 3, 3, 12, 0)),
            Some(at(2026, 3, 4, 6, 30))
        );
    }

    #[test]
    fn test_seconds_field_is_accepted() {
        let schedule = CycleSchedule::parse("15 0 3 * * *").unwrap();
        assert_eq!(
            schedule.next_after(at(2026, 3, 2, 0, 0)),
            Some(Utc.with_ymd_and_hms(2026, 3, 2, 3, 0, 15).unwrap())
        );
    }

    #[test]
    fn test_rejects_malformed_expressions() {
        assert!(matches!(
            CycleSchedule::parse("* * *"),
            Err(AppError::Config(_))
        ));
        assert!(matches!(
            CycleSchedule::parse("0 25 * * *"),
            Err(AppError::Config(_))
        ));
    }
}
