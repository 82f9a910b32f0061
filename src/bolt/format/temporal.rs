//! chrono <-> wire field conversions for temporal structures.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::bolt::packstream::PackStreamError;

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

pub(super) fn epoch_days(date: &NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - UNIX_EPOCH_DAYS_FROM_CE
}

pub(super) fn date_from_epoch_days(days: i64) -> Result<NaiveDate, PackStreamError> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(|d| i32::try_from(d).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
        .ok_or_else(|| invalid("Date", days))
}

pub(super) fn nanos_of_day(time: &NaiveTime) -> i64 {
    time.num_seconds_from_midnight() as i64 * NANOS_PER_SECOND + time.nanosecond() as i64
}

pub(super) fn time_from_nanos_of_day(nanos: i64) -> Result<NaiveTime, PackStreamError> {
    if nanos < 0 {
        return Err(invalid("Time", nanos));
    }
    let secs = u32::try_from(nanos / NANOS_PER_SECOND).map_err(|_| invalid("Time", nanos))?;
    let sub = (nanos % NANOS_PER_SECOND) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, sub).ok_or_else(|| invalid("Time", nanos))
}

/// `(epoch_seconds, nanos)` of a wall-clock date-time read as UTC.
pub(super) fn local_epoch(dt: &NaiveDateTime) -> (i64, i64) {
    let utc = dt.and_utc();
    (utc.timestamp(), utc.timestamp_subsec_nanos() as i64)
}

pub(super) fn local_from_epoch(seconds: i64, nanos: i64) -> Result<NaiveDateTime, PackStreamError> {
    let nanos = u32::try_from(nanos).map_err(|_| invalid("LocalDateTime nanos", nanos))?;
    DateTime::from_timestamp(seconds, nanos)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| invalid("LocalDateTime", seconds))
}

/// Wire fields `[seconds, nanos, offset]` of an offset date-time.
///
/// With `utc` the seconds count from the UTC epoch; otherwise they are the
/// local wall-clock seconds (`utc + offset`).
pub(super) fn offset_date_time_fields(dt: &DateTime<FixedOffset>, utc: bool) -> (i64, i64, i64) {
    let offset = dt.offset().local_minus_utc() as i64;
    let seconds = if utc { dt.timestamp() } else { dt.timestamp() + offset };
    (seconds, dt.timestamp_subsec_nanos() as i64, offset)
}

pub(super) fn offset_date_time(
    seconds: i64,
    nanos: i64,
    offset_seconds: i64,
    utc: bool,
) -> Result<DateTime<FixedOffset>, PackStreamError> {
    let offset = i32::try_from(offset_seconds)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| invalid("DateTime offset", offset_seconds))?;
    let utc_seconds = if utc {
        seconds
    } else {
        seconds
            .checked_sub(offset_seconds)
            .ok_or_else(|| invalid("DateTime", seconds))?
    };
    let nanos = u32::try_from(nanos).map_err(|_| invalid("DateTime nanos", nanos))?;
    DateTime::from_timestamp(utc_seconds, nanos)
        .map(|dt| dt.with_timezone(&offset))
        .ok_or_else(|| invalid("DateTime", seconds))
}

fn invalid(what: &str, value: i64) -> PackStreamError {
    PackStreamError::InvalidStructure(format!("{} out of range: {}", what, value))
}
