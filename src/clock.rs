use time::{macros::format_description, OffsetDateTime};

/// Milliseconds since the Unix epoch, the unit `lastStatus` is kept in.
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

/// `HH:MM:SS` stamp put on messages. Local time when the offset can be
/// determined, UTC otherwise.
pub fn wall_clock() -> Result<String, time::error::Format> {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    clock_time(now)
}

pub fn clock_time(at: OffsetDateTime) -> Result<String, time::error::Format> {
    at.format(format_description!("[hour]:[minute]:[second]"))
}
