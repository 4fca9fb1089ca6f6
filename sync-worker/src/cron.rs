//! Five-field cron expression parsing and next-run computation.
//!
//! Fields are `minute hour day-of-month month day-of-week` with the usual
//! forms per field: `*`, `a`, `a-b`, `*/n`, `a-b/n`, `a/n`, and comma lists.
//! Day-of-week accepts 0-7 with both 0 and 7 meaning Sunday. When both the
//! day-of-month and day-of-week fields are restricted, a day matching either
//! one fires (the classic union rule).

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Errors from cron expression validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CronParseError {
    /// Empty or whitespace-only expression.
    #[error("cron expression is empty")]
    Empty,

    /// Wrong number of fields.
    #[error(
        "cron expression must have 5 fields (minute hour day-of-month month day-of-week), got {got}"
    )]
    FieldCount { got: usize },

    /// A field that cannot be parsed.
    #[error("invalid {field} field: {value}")]
    InvalidField { field: &'static str, value: String },

    /// A numeric value outside the field's range.
    #[error("{field} value {value} out of range {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// A `/0` step.
    #[error("step must be > 0 in {field} field")]
    ZeroStep { field: &'static str },
}

/// A validated cron schedule.
#[derive(Clone, Debug)]
pub struct CronSchedule {
    minutes: [bool; 60],
    hours: [bool; 24],
    days_of_month: [bool; 32], // 1..=31
    months: [bool; 13],        // 1..=12
    days_of_week: [bool; 7],   // 0 = Sunday
    dom_restricted: bool,
    dow_restricted: bool,
}

impl CronSchedule {
    /// Parses and range-validates a five-field cron expression.
    ///
    /// # Errors
    /// Returns a [`CronParseError`] describing the first violation found.
    pub fn parse(expression: &str) -> Result<Self, CronParseError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(CronParseError::Empty);
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(CronParseError::FieldCount { got: fields.len() });
        }

        let mut schedule = Self {
            minutes: [false; 60],
            hours: [false; 24],
            days_of_month: [false; 32],
            months: [false; 13],
            days_of_week: [false; 7],
            // The union rule keys off whether the field is a wildcard form.
            dom_restricted: !fields[2].contains('*'),
            dow_restricted: !fields[4].contains('*'),
        };

        for v in parse_field(fields[0], "minute", 0, 59)? {
            schedule.minutes[v as usize] = true;
        }
        for v in parse_field(fields[1], "hour", 0, 23)? {
            schedule.hours[v as usize] = true;
        }
        for v in parse_field(fields[2], "day-of-month", 1, 31)? {
            schedule.days_of_month[v as usize] = true;
        }
        for v in parse_field(fields[3], "month", 1, 12)? {
            schedule.months[v as usize] = true;
        }
        for v in parse_field(fields[4], "day-of-week", 0, 7)? {
            schedule.days_of_week[(v % 7) as usize] = true;
        }

        Ok(schedule)
    }

    /// First fire time strictly after `after`, evaluated in `tz`.
    ///
    /// Returns `None` when the expression can never fire (e.g. February 30)
    /// within a four-year horizon.
    pub fn next_after(&self, after: DateTime<Utc>, tz: Tz) -> Option<DateTime<Utc>> {
        let mut t = (after + Duration::minutes(1))
            .with_second(0)?
            .with_nanosecond(0)?;
        let horizon = after + Duration::days(4 * 366);

        while t <= horizon {
            let local = t.with_timezone(&tz);

            if !self.matches_day(&local) {
                // Jump toward the next local midnight. Under a DST shift the
                // jump can land an hour off, but the loop re-checks after
                // every jump so matching stays exact.
                let minutes_today = local.hour() * 60 + local.minute();
                let jump = (24 * 60 - minutes_today).max(1);
                t += Duration::minutes(i64::from(jump));
                continue;
            }
            if !self.hours[local.hour() as usize] {
                t += Duration::minutes(i64::from(60 - local.minute()));
                continue;
            }
            if !self.minutes[local.minute() as usize] {
                t += Duration::minutes(1);
                continue;
            }
            return Some(t);
        }

        None
    }

    fn matches_day(&self, local: &DateTime<Tz>) -> bool {
        if !self.months[local.month() as usize] {
            return false;
        }

        let dom = self.days_of_month[local.day() as usize];
        let dow = self.days_of_week[local.weekday().num_days_from_sunday() as usize];
        match (self.dom_restricted, self.dow_restricted) {
            (true, true) => dom || dow,
            (true, false) => dom,
            (false, true) => dow,
            (false, false) => true,
        }
    }
}

/// Expands one field spec into its allowed values.
fn parse_field(
    spec: &str,
    field: &'static str,
    min: u32,
    max: u32,
) -> Result<Vec<u32>, CronParseError> {
    let invalid = || CronParseError::InvalidField {
        field,
        value: spec.to_string(),
    };

    let mut values = Vec::new();

    for part in spec.split(',') {
        if part.is_empty() {
            return Err(invalid());
        }

        let (range_part, step) = match part.split_once('/') {
            Some((r, s)) => {
                let step: u32 = s.parse().map_err(|_| invalid())?;
                if step == 0 {
                    return Err(CronParseError::ZeroStep { field });
                }
                (r, step)
            }
            None => (part, 1),
        };

        let (start, end) = if range_part == "*" {
            (min, max)
        } else if let Some((a, b)) = range_part.split_once('-') {
            (
                a.parse::<u32>().map_err(|_| invalid())?,
                b.parse::<u32>().map_err(|_| invalid())?,
            )
        } else {
            let a = range_part.parse::<u32>().map_err(|_| invalid())?;
            // `a/n` runs from a to the field maximum; bare `a` is just a.
            if part.contains('/') { (a, max) } else { (a, a) }
        };

        for value in [start, end] {
            if value < min || value > max {
                return Err(CronParseError::OutOfRange {
                    field,
                    value,
                    min,
                    max,
                });
            }
        }
        if start > end {
            return Err(invalid());
        }

        let mut v = start;
        while v <= end {
            values.push(v);
            v += step;
        }
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Asia::Tokyo;
    use chrono_tz::UTC;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn rejects_empty_expression() {
        assert!(matches!(CronSchedule::parse(""), Err(CronParseError::Empty)));
        assert!(matches!(
            CronSchedule::parse("   "),
            Err(CronParseError::Empty)
        ));
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(matches!(
            CronSchedule::parse("* * *"),
            Err(CronParseError::FieldCount { got: 3 })
        ));
        assert!(matches!(
            CronSchedule::parse("* * * * * *"),
            Err(CronParseError::FieldCount { got: 6 })
        ));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            CronSchedule::parse("60 * * * *"),
            Err(CronParseError::OutOfRange { field: "minute", value: 60, .. })
        ));
        assert!(matches!(
            CronSchedule::parse("0 25 * * *"),
            Err(CronParseError::OutOfRange { field: "hour", value: 25, .. })
        ));
        assert!(matches!(
            CronSchedule::parse("0 0 0 * *"),
            Err(CronParseError::OutOfRange { field: "day-of-month", value: 0, .. })
        ));
        assert!(matches!(
            CronSchedule::parse("0 0 * 13 *"),
            Err(CronParseError::OutOfRange { field: "month", value: 13, .. })
        ));
        assert!(matches!(
            CronSchedule::parse("0 0 * * 8"),
            Err(CronParseError::OutOfRange { field: "day-of-week", value: 8, .. })
        ));
    }

    #[test]
    fn rejects_garbage_and_zero_steps() {
        assert!(matches!(
            CronSchedule::parse("a b c d e"),
            Err(CronParseError::InvalidField { field: "minute", .. })
        ));
        assert!(matches!(
            CronSchedule::parse("*/0 * * * *"),
            Err(CronParseError::ZeroStep { field: "minute" })
        ));
        assert!(matches!(
            CronSchedule::parse("10-5 * * * *"),
            Err(CronParseError::InvalidField { .. })
        ));
    }

    #[test]
    fn daily_at_two_in_tokyo() {
        let schedule = CronSchedule::parse("0 2 * * *").unwrap();

        // 2025-06-01 09:00 JST -> next 02:00 JST is June 2nd.
        let next = schedule.next_after(utc(2025, 6, 1, 0, 0), Tokyo).unwrap();
        assert_eq!(next, utc(2025, 6, 1, 17, 0));

        // Just before the fire time: 2025-06-02 01:59 JST.
        let next = schedule.next_after(utc(2025, 6, 1, 16, 59), Tokyo).unwrap();
        assert_eq!(next, utc(2025, 6, 1, 17, 0));

        // Exactly at the fire time moves to the next day (strictly after).
        let next = schedule.next_after(utc(2025, 6, 1, 17, 0), Tokyo).unwrap();
        assert_eq!(next, utc(2025, 6, 2, 17, 0));
    }

    #[test]
    fn every_fifteen_minutes() {
        let schedule = CronSchedule::parse("*/15 * * * *").unwrap();
        let next = schedule.next_after(utc(2025, 6, 1, 10, 7), UTC).unwrap();
        assert_eq!(next, utc(2025, 6, 1, 10, 15));

        let next = schedule.next_after(utc(2025, 6, 1, 10, 45), UTC).unwrap();
        assert_eq!(next, utc(2025, 6, 1, 11, 0));
    }

    #[test]
    fn day_of_month_and_week_union_rule() {
        // 13th of the month OR Friday. From Sunday 2025-06-01 the first
        // match is Friday 2025-06-06, before the 13th.
        let schedule = CronSchedule::parse("0 0 13 * 5").unwrap();
        let next = schedule.next_after(utc(2025, 6, 1, 12, 0), UTC).unwrap();
        assert_eq!(next, utc(2025, 6, 6, 0, 0));
    }

    #[test]
    fn sunday_accepts_both_zero_and_seven() {
        let zero = CronSchedule::parse("0 9 * * 0").unwrap();
        let seven = CronSchedule::parse("0 9 * * 7").unwrap();
        // 2025-06-01 is a Sunday.
        let after = utc(2025, 5, 30, 0, 0);
        assert_eq!(
            zero.next_after(after, UTC),
            seven.next_after(after, UTC),
        );
        assert_eq!(zero.next_after(after, UTC).unwrap(), utc(2025, 6, 1, 9, 0));
    }

    #[test]
    fn leap_day_schedule_finds_next_leap_year() {
        let schedule = CronSchedule::parse("0 0 29 2 *").unwrap();
        let next = schedule.next_after(utc(2025, 1, 1, 0, 0), UTC).unwrap();
        assert_eq!(next, utc(2028, 2, 29, 0, 0));
    }

    #[test]
    fn impossible_date_returns_none() {
        let schedule = CronSchedule::parse("0 2 30 2 *").unwrap();
        assert_eq!(schedule.next_after(utc(2025, 1, 1, 0, 0), UTC), None);
    }

    #[test]
    fn list_and_range_fields() {
        let schedule = CronSchedule::parse("5,35 9-17 * * 1-5").unwrap();
        // 2025-06-02 is a Monday.
        let next = schedule.next_after(utc(2025, 5, 31, 12, 0), UTC).unwrap();
        assert_eq!(next, utc(2025, 6, 2, 9, 5));

        let next = schedule.next_after(utc(2025, 6, 2, 9, 5), UTC).unwrap();
        assert_eq!(next, utc(2025, 6, 2, 9, 35));
    }
}
