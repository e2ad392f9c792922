use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// The current time in `canonical_timezone`, falling back to UTC when the
/// timezone string is not recognized.
pub fn local_now(canonical_timezone: &str) -> OffsetDateTime {
    match get_local_offset(canonical_timezone) {
        Some(offset) => OffsetDateTime::now_utc().to_offset(offset),
        None => OffsetDateTime::now_utc(),
    }
}

/// Today's date in `canonical_timezone`, falling back to UTC.
pub fn local_date(canonical_timezone: &str) -> Date {
    local_now(canonical_timezone).date()
}
