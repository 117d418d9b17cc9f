//! UTC timestamps as Unix seconds, with ISO-8601 conversion (no chrono dependency).
//!
//! Date math uses Howard Hinnant's civil/days algorithms.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::SECS_PER_DAY;

/// Seconds since the Unix epoch, UTC.
pub type Timestamp = u64;

/// Largest timestamp that fits a signed 64-bit column.
pub const MAX_TIMESTAMP: Timestamp = i64::MAX as u64;

/// Last year `iso8601_to_unix` accepts.
const MAX_YEAR: i64 = 9999;

/// Current UTC time as Unix seconds.
pub fn now_unix_secs() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// `ts` shifted forward by whole days, clamped to `MAX_TIMESTAMP`.
pub fn add_days(ts: Timestamp, days: u64) -> Timestamp {
    ts.saturating_add(days.saturating_mul(SECS_PER_DAY))
        .min(MAX_TIMESTAMP)
}

/// Convert Unix seconds to an ISO-8601 UTC string.
pub fn unix_to_iso8601(secs: Timestamp) -> String {
    let days = (secs / SECS_PER_DAY) as i64;
    let time_of_day = secs % SECS_PER_DAY;
    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (y, m, d) = civil_from_days(days);
    format!("{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}Z")
}

/// Parse `YYYY-MM-DDTHH:MM:SS[.fff]Z` into Unix seconds.
/// Fractional seconds are truncated. Returns None for anything else,
/// including dates before the epoch or after year 9999.
pub fn iso8601_to_unix(s: &str) -> Option<Timestamp> {
    let s = s.strip_suffix('Z')?;
    let (date, time) = s.split_once('T')?;

    let mut date_parts = date.splitn(3, '-');
    let y: i64 = date_parts.next()?.parse().ok()?;
    let m: u64 = date_parts.next()?.parse().ok()?;
    let d: u64 = date_parts.next()?.parse().ok()?;
    if !(0..=MAX_YEAR).contains(&y) || !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return None;
    }

    let time = time.split('.').next()?;
    let mut time_parts = time.splitn(3, ':');
    let hh: u64 = time_parts.next()?.parse().ok()?;
    let mm: u64 = time_parts.next()?.parse().ok()?;
    let ss: u64 = time_parts.next()?.parse().ok()?;
    if hh > 23 || mm > 59 || ss > 60 {
        return None;
    }

    let days = u64::try_from(days_from_civil(y, m, d)).ok()?;
    days.checked_mul(SECS_PER_DAY)?
        .checked_add(hh * 3600 + mm * 60 + ss)
}

/// Howard Hinnant's civil_from_days: Unix epoch days → (year, month, day).
fn civil_from_days(days: i64) -> (i64, u64, u64) {
    let z = days + 719468;
    let era = if z >= 0 { z } else { z - 146096 } / 146097;
    let doe = (z - era * 146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}

/// Inverse of `civil_from_days`.
fn days_from_civil(y: i64, m: u64, d: u64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as u64;
    let mp = if m > 2 { m - 3 } else { m + 9 };
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146097 + doe as i64 - 719468
}
