use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Result, SchedulerError};

/// Fallback sleep when a schedule yields no next occurrence. A normalized
/// 5-field expression always recurs, so this only guards the type system.
const FALLBACK_SECS: u64 = 60;

/// A validated 5-field cron expression (minute, hour, day-of-month, month,
/// day-of-week), evaluated at minute granularity in UTC.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    inner: cron::Schedule,
    expression: String,
}

impl CronSchedule {
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The first occurrence strictly after `from`.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.inner.after(&from).next()
    }
}

impl std::fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.expression)
    }
}

const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Remap numeric day-of-week values from the standard crontab convention
/// (0-7, with 0 and 7 both Sunday, 1 Monday) to day names.
///
/// The `cron` crate numbers days 1-7 starting at Sunday, so passing digits
/// through unchanged would shift every weekday schedule by one and reject
/// `0`. Names are unambiguous in both conventions. Lists, ranges and step
/// divisors keep their structure; out-of-range digits pass through and are
/// rejected by the crate's own parser.
fn normalize_day_of_week(field: &str) -> String {
    field
        .split(',')
        .map(|element| {
            let (range, step) = match element.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (element, None),
            };
            let named = range
                .split('-')
                .map(|value| match value.parse::<usize>() {
                    Ok(0) | Ok(7) => DAY_NAMES[0].to_string(),
                    Ok(n @ 1..=6) => DAY_NAMES[n].to_string(),
                    _ => value.to_string(),
                })
                .collect::<Vec<_>>()
                .join("-");
            match step {
                Some(step) => format!("{named}/{step}"),
                None => named,
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Validate and parse a standard 5-field cron expression.
///
/// The `cron` crate wants a seconds field, so the expression is normalized
/// by prepending `0` — firing always lands on the minute boundary. The
/// day-of-week field additionally goes through [`normalize_day_of_week`].
pub fn parse(expression: &str) -> Result<CronSchedule> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(SchedulerError::InvalidCron {
            expression: expression.to_string(),
            reason: format!("expected 5 fields, got {}", fields.len()),
        });
    }

    let normalized = format!(
        "0 {} {} {} {} {}",
        fields[0],
        fields[1],
        fields[2],
        fields[3],
        normalize_day_of_week(fields[4])
    );
    let inner = cron::Schedule::from_str(&normalized).map_err(|e| SchedulerError::InvalidCron {
        expression: expression.to_string(),
        reason: e.to_string(),
    })?;

    Ok(CronSchedule {
        inner,
        expression: fields.join(" "),
    })
}

/// Whole seconds from `from` until the schedule's next occurrence.
/// Deterministic for a given `(schedule, from)` pair.
pub fn next_fire_in_seconds(schedule: &CronSchedule, from: DateTime<Utc>) -> u64 {
    match schedule.next_after(from) {
        Some(next) => (next - from).num_seconds().max(0) as u64,
        None => FALLBACK_SECS,
    }
}

/// Sleep amount until the next occurrence, at millisecond precision.
///
/// Tasks sleep on this rather than on [`next_fire_in_seconds`] so that the
/// truncation to whole seconds can't wake them just before the minute
/// boundary and make them spin.
pub fn next_fire_delay(schedule: &CronSchedule, from: DateTime<Utc>) -> Duration {
    match schedule.next_after(from) {
        Some(next) => (next - from).to_std().unwrap_or(Duration::ZERO),
        None => Duration::from_secs(FALLBACK_SECS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike};

    #[test]
    fn accepts_common_expressions() {
        for expr in ["0 19 * * *", "*/30 * 1 * *", "15 8 * * 1-5", "0 0 1 1 *"] {
            let parsed = parse(expr).unwrap();
            assert_eq!(parsed.expression(), expr);
        }
    }

    #[test]
    fn rejects_wrong_field_count() {
        for expr in ["", "* * * *", "* * * * * *", "0 19 * *"] {
            assert!(matches!(
                parse(expr),
                Err(SchedulerError::InvalidCron { .. })
            ));
        }
    }

    #[test]
    fn rejects_out_of_range_and_garbage() {
        for expr in ["61 * * * *", "* 25 * * *", "* * * 13 *", "not a cron at all"] {
            assert!(matches!(
                parse(expr),
                Err(SchedulerError::InvalidCron { .. })
            ));
        }
    }

    #[test]
    fn day_of_week_follows_standard_crontab_numbering() {
        // 2024-01-03 is a Wednesday.
        let from = Utc.with_ymd_and_hms(2024, 1, 3, 13, 0, 0).unwrap();

        let sunday = parse("0 12 * * 0").unwrap();
        let next = sunday.next_after(from).unwrap();
        assert_eq!(next.weekday(), chrono::Weekday::Sun);
        assert_eq!((next.day(), next.hour()), (7, 12));

        let monday = parse("0 12 * * 1").unwrap();
        let next = monday.next_after(from).unwrap();
        assert_eq!(next.weekday(), chrono::Weekday::Mon);
        assert_eq!(next.day(), 8);
    }

    #[test]
    fn seven_is_also_sunday() {
        let from = Utc.with_ymd_and_hms(2024, 1, 3, 13, 0, 0).unwrap();
        let schedule = parse("0 12 * * 7").unwrap();
        assert_eq!(
            schedule.next_after(from).unwrap().weekday(),
            chrono::Weekday::Sun
        );
    }

    #[test]
    fn weekday_range_skips_the_weekend() {
        // 2024-01-06 is a Saturday.
        let from = Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap();
        let schedule = parse("0 19 * * 1-5").unwrap();
        let next = schedule.next_after(from).unwrap();
        assert_eq!(next.weekday(), chrono::Weekday::Mon);
        assert_eq!((next.day(), next.hour()), (8, 19));
    }

    #[test]
    fn day_of_week_lists_are_remapped() {
        // Wed 13:00 with "Wed and Sat at 12:00": Wednesday is past, so Saturday.
        let from = Utc.with_ymd_and_hms(2024, 1, 3, 13, 0, 0).unwrap();
        let schedule = parse("0 12 * * 3,6").unwrap();
        assert_eq!(
            schedule.next_after(from).unwrap().weekday(),
            chrono::Weekday::Sat
        );
    }

    #[test]
    fn day_of_week_normalization_keeps_structure() {
        assert_eq!(normalize_day_of_week("0"), "SUN");
        assert_eq!(normalize_day_of_week("7"), "SUN");
        assert_eq!(normalize_day_of_week("1-5"), "MON-FRI");
        assert_eq!(normalize_day_of_week("0,3,6"), "SUN,WED,SAT");
        assert_eq!(normalize_day_of_week("*/2"), "*/2");
        assert_eq!(normalize_day_of_week("1-5/2"), "MON-FRI/2");
        assert_eq!(normalize_day_of_week("MON"), "MON");
        assert_eq!(normalize_day_of_week("8"), "8");
    }

    #[test]
    fn rejects_day_of_week_eight() {
        assert!(matches!(
            parse("0 12 * * 8"),
            Err(SchedulerError::InvalidCron { .. })
        ));
    }

    #[test]
    fn next_fire_matches_pattern_at_minute_granularity() {
        let schedule = parse("0 19 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();

        let secs = next_fire_in_seconds(&schedule, from);
        let fire = from + chrono::Duration::seconds(secs as i64);
        assert_eq!(fire.hour(), 19);
        assert_eq!(fire.minute(), 0);
        assert_eq!(fire.second(), 0);
    }

    #[test]
    fn matching_instant_advances_to_next_occurrence() {
        let schedule = parse("0 19 * * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 1, 15, 19, 0, 0).unwrap();

        // `after` is strictly after, so an exact hit rolls to tomorrow.
        let next = schedule.next_after(from).unwrap();
        assert_eq!(next.day(), 16);
        assert_eq!(next_fire_in_seconds(&schedule, from), 24 * 3600);
    }

    #[test]
    fn half_hour_steps_on_first_of_month() {
        // 1st of the month at 00:05 with "*/30 * 1 * *" fires at 00:30.
        let schedule = parse("*/30 * 1 * *").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 3, 1, 0, 5, 0).unwrap();

        assert_eq!(next_fire_in_seconds(&schedule, from), 25 * 60);
        let next = schedule.next_after(from).unwrap();
        assert_eq!((next.day(), next.hour(), next.minute()), (1, 0, 30));
    }

    #[test]
    fn evaluation_is_deterministic() {
        let schedule = parse("15 8 * * 1-5").unwrap();
        let from = Utc.with_ymd_and_hms(2024, 6, 7, 23, 59, 59).unwrap();
        assert_eq!(
            next_fire_in_seconds(&schedule, from),
            next_fire_in_seconds(&schedule, from)
        );
    }

    #[test]
    fn delay_is_millisecond_precise() {
        let schedule = parse("* * * * *").unwrap();
        let from = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 30)
            .unwrap()
            .with_nanosecond(500_000_000)
            .unwrap();

        // 29.5s to the next minute boundary; whole-second API truncates.
        assert_eq!(next_fire_delay(&schedule, from), Duration::from_millis(29_500));
        assert_eq!(next_fire_in_seconds(&schedule, from), 29);
    }
}
