//! Human-friendly timestamps for cards, comments and notifications.

use std::fmt::Write as _;

use chrono::{DateTime, Local, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// `(exclusive upper bound in seconds, seconds per unit, unit name)`.
const THRESHOLDS: [(i64, i64, &str); 6] = [
    (MINUTE, 1, "second"),
    (HOUR, MINUTE, "minute"),
    (DAY, HOUR, "hour"),
    (WEEK, DAY, "day"),
    (MONTH, WEEK, "week"),
    (YEAR, MONTH, "month"),
];

/// Relative distances of this many years or more are shown as a date.
const MAX_RELATIVE_YEARS: i64 = 5;

/// Division rounding half toward positive infinity.
const fn round_div(value: i64, divisor: i64) -> i64 {
    (2 * value + divisor).div_euclid(2 * divisor)
}

fn phrase(value: i64, unit: &str) -> String {
    match (value, unit) {
        (0, "second") => "now".to_string(),
        (1, "day") => "tomorrow".to_string(),
        (-1, "day") => "yesterday".to_string(),
        (1, "week" | "month" | "year") => format!("next {unit}"),
        (-1, "week" | "month" | "year") => format!("last {unit}"),
        _ => {
            let n = value.unsigned_abs();
            let plural = if n == 1 { "" } else { "s" };
            if value > 0 {
                format!("in {n} {unit}{plural}")
            } else {
                format!("{n} {unit}{plural} ago")
            }
        }
    }
}

/// Formats `then` relative to `now`: "now", "5 minutes ago", "in 2 hours",
/// "yesterday", "last month", ... Beyond five years it falls back to a
/// short absolute date.
#[must_use]
pub fn format_relative(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff_sec = round_div((then - now).num_milliseconds(), 1000);
    let magnitude = diff_sec.abs();

    for (limit, divisor, unit) in THRESHOLDS {
        if magnitude < limit {
            return phrase(round_div(diff_sec, divisor), unit);
        }
    }

    let years = round_div(diff_sec, YEAR);
    if years.abs() < MAX_RELATIVE_YEARS {
        return phrase(years, "year");
    }
    format_absolute(then, "%b %-d, %Y")
}

/// Formats `then` in local time with a chrono format string. An invalid
/// format string falls back to RFC 3339.
#[must_use]
pub fn format_absolute(then: DateTime<Utc>, format: &str) -> String {
    let local = then.with_timezone(&Local);
    let mut out = String::new();
    if write!(out, "{}", local.format(format)).is_err() {
        return local.to_rfc3339();
    }
    out
}
