use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc, Weekday};

// ── TimestampConverter ────────────────────────────────────────────────────────

/// Seconds between 1601-01-01T00:00:00Z (the browser history epoch) and the
/// UNIX epoch.
pub const EPOCH_OFFSET_SECS: i64 = 11_644_473_600;

const MICROS_PER_SEC: i64 = 1_000_000;
const EPOCH_OFFSET_MICROS: i64 = EPOCH_OFFSET_SECS * MICROS_PER_SEC;

/// Converts between native history timestamps (microseconds since
/// 1601-01-01 UTC) and UTC instants.
///
/// All arithmetic is done in integer microseconds, so any instant with
/// microsecond resolution survives `to_raw` → `to_instant` unchanged.
pub struct TimestampConverter;

impl TimestampConverter {
    /// Convert a raw history timestamp into a UTC instant.
    ///
    /// Values beyond the range chrono can represent clamp to
    /// [`DateTime::<Utc>::MIN_UTC`] / [`DateTime::<Utc>::MAX_UTC`].
    pub fn to_instant(raw: i64) -> DateTime<Utc> {
        let unix_micros = raw.saturating_sub(EPOCH_OFFSET_MICROS);
        DateTime::from_timestamp_micros(unix_micros).unwrap_or(if unix_micros < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    /// Convert a UTC instant back into a raw history timestamp.
    ///
    /// Sub-microsecond precision is truncated.
    pub fn to_raw(instant: DateTime<Utc>) -> i64 {
        instant.timestamp_micros().saturating_add(EPOCH_OFFSET_MICROS)
    }
}

// ── Calendar helpers ──────────────────────────────────────────────────────────

/// UTC calendar date of `ts`; the date portion of its ISO-8601 form.
pub fn utc_date(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

/// UTC hour of day (0-23).
pub fn utc_hour(ts: DateTime<Utc>) -> usize {
    ts.hour() as usize
}

/// UTC weekday.
pub fn utc_weekday(ts: DateTime<Utc>) -> Weekday {
    ts.weekday()
}
