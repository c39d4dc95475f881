//! Parsing of `--stop-at` expressions.
//!
//! Accepted forms:
//! - RFC 3339: `2026-10-17T06:00:00+02:00`
//! - local date and time: `2026-10-17 06:00` or `2026-10-17 06:00:30`
//! - local time of day: `06:00`, the next occurrence after now
//! - relative: `+1h30m`, `1h 30m`, `90min`, `2 hours`, `1d`

use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};

use crate::error::{PurgeError, Result};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Resolve a deadline expression against `now`.
pub fn parse_deadline(expr: &str, now: DateTime<Local>) -> Result<DateTime<Local>> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(invalid(expr, "empty expression"));
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(expr) {
        return Ok(at.with_timezone(&Local));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(expr, format) {
            return local(expr, naive);
        }
    }

    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(expr, format) {
            let today = local(expr, now.date_naive().and_time(time))?;
            if today > now {
                return Ok(today);
            }
            let tomorrow = now
                .date_naive()
                .succ_opt()
                .ok_or_else(|| invalid(expr, "date out of range"))?;
            return local(expr, tomorrow.and_time(time));
        }
    }

    let offset = parse_relative(expr)?;
    now.checked_add_signed(offset)
        .ok_or_else(|| invalid(expr, "date out of range"))
}

/// Parse relative offsets such as `+1h30m`, `1h 30m` or `2 hours`.
pub fn parse_relative(expr: &str) -> Result<TimeDelta> {
    let body = expr.trim();
    let body = body.strip_prefix('+').unwrap_or(body).trim_start();
    if body.is_empty() {
        return Err(invalid(expr, "empty offset"));
    }

    let duration = humantime::parse_duration(body).map_err(|e| invalid(expr, &e.to_string()))?;
    if duration.is_zero() {
        return Err(invalid(expr, "offset must be positive"));
    }
    TimeDelta::from_std(duration).map_err(|_| invalid(expr, "offset too large"))
}

fn local(expr: &str, naive: NaiveDateTime) -> Result<DateTime<Local>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| invalid(expr, "time does not exist in the local timezone"))
}

fn invalid(expr: &str, why: &str) -> PurgeError {
    PurgeError::InvalidDeadline(format!("{:?}: {}", expr, why))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn noon() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).earliest().unwrap()
    }

    #[test]
    fn test_relative_forms() {
        assert_eq!(parse_relative("+1h30m").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_relative("90m").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_relative("45s").unwrap(), TimeDelta::seconds(45));
        assert_eq!(parse_relative("1d").unwrap(), TimeDelta::hours(24));
    }

    #[test]
    fn test_relative_spelled_out_forms() {
        assert_eq!(parse_relative("1h 30m").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_relative("2 hours").unwrap(), TimeDelta::hours(2));
        assert_eq!(parse_relative("90min").unwrap(), TimeDelta::minutes(90));
        assert_eq!(parse_relative("+ 15 minutes").unwrap(), TimeDelta::minutes(15));
    }

    #[test]
    fn test_parse_deadline_with_spaced_offset() {
        let deadline = parse_deadline("1h 30m", noon()).unwrap();
        assert_eq!(deadline - noon(), TimeDelta::minutes(90));
    }

    #[test]
    fn test_relative_rejects_garbage() {
        assert!(parse_relative("10").is_err());
        assert!(parse_relative("h").is_err());
        assert!(parse_relative("5x").is_err());
        assert!(parse_relative("0m").is_err());
        assert!(parse_relative("+").is_err());
        assert!(parse_relative("99999999999999999999d").is_err());
    }

    #[test]
    fn test_parse_relative_deadline() {
        let deadline = parse_deadline("+2h", noon()).unwrap();
        assert_eq!(deadline - noon(), TimeDelta::hours(2));
    }

    #[test]
    fn test_parse_rfc3339() {
        let deadline = parse_deadline("2026-10-17T06:00:00+00:00", noon()).unwrap();
        assert_eq!(deadline.timestamp(), 1_792_216_800);
    }

    #[test]
    fn test_parse_local_datetime() {
        let deadline = parse_deadline("2026-10-17 06:30", noon()).unwrap();
        assert_eq!(deadline.date_naive().to_string(), "2026-10-17");
        assert_eq!((deadline.hour(), deadline.minute()), (6, 30));
    }

    #[test]
    fn test_time_of_day_later_today() {
        let deadline = parse_deadline("18:00", noon()).unwrap();
        assert_eq!(deadline.date_naive(), noon().date_naive());
        assert_eq!(deadline.hour(), 18);
    }

    #[test]
    fn test_time_of_day_already_passed_rolls_over() {
        let deadline = parse_deadline("06:00", noon()).unwrap();
        assert_eq!(deadline.date_naive().to_string(), "2026-10-17");
        assert_eq!(deadline.hour(), 6);
    }

    #[test]
    fn test_invalid_expressions() {
        for expr in ["", "tomorrow", "25:99", "2026-13-01 00:00", "soon-ish"] {
            let result = parse_deadline(expr, noon());
            assert!(matches!(result, Err(PurgeError::InvalidDeadline(_))), "{:?} should fail", expr);
        }
    }
}
