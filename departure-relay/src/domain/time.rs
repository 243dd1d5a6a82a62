//! Clock and delay labels for departure times.
//!
//! The backend sends ISO 8601 timestamps. The watch only has room for a
//! compact `H:MM` clock and a signed minute count, so all time formatting
//! happens here before anything is encoded.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Timelike, Utc};

/// Formats accepted for timestamps that carry no UTC offset.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Error returned when a timestamp cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp {input:?}: {reason}")]
pub struct TimeError {
    input: String,
    reason: &'static str,
}

impl TimeError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.chars().take(64).collect(),
            reason,
        }
    }
}

/// The zone clock labels are rendered in.
///
/// `Local` follows the host's time zone, which is what a rider reading the
/// watch expects. `Fixed` pins an offset, which keeps output reproducible.
///
/// # Examples
///
/// ```
/// use departure_relay::domain::DisplayZone;
///
/// let zone = DisplayZone::utc();
/// assert_eq!(zone.format_clock("2024-01-01T09:05:00+00:00").unwrap(), "9:05");
/// assert_eq!(
///     zone.delay_label("2024-01-01T10:05:00+00:00", "2024-01-01T10:00:00+00:00").unwrap(),
///     "+5"
/// );
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl DisplayZone {
    /// A zone pinned to UTC.
    pub fn utc() -> Self {
        DisplayZone::Fixed(Utc.fix())
    }

    /// Parse an ISO 8601 date-time.
    ///
    /// RFC 3339 input keeps its own offset. Input without an offset is read
    /// as wall-clock time in this zone.
    pub fn parse(&self, iso: &str) -> Result<DateTime<FixedOffset>, TimeError> {
        let trimmed = iso.trim();

        if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(instant);
        }

        let naive = NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .ok_or_else(|| TimeError::new(iso, "expected an ISO 8601 date-time"))?;

        let resolved = match self {
            DisplayZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|instant| instant.fixed_offset()),
            DisplayZone::Fixed(offset) => offset.from_local_datetime(&naive).single(),
        };

        resolved.ok_or_else(|| TimeError::new(iso, "wall-clock time does not exist in zone"))
    }

    /// Format a timestamp as `H:MM` on a 24-hour clock.
    ///
    /// The hour has no leading zero; minutes are always two digits.
    pub fn format_clock(&self, iso: &str) -> Result<String, TimeError> {
        let instant = self.parse(iso)?;

        let (hour, minute) = match self {
            DisplayZone::Local => {
                let local = instant.with_timezone(&Local);
                (local.hour(), local.minute())
            }
            DisplayZone::Fixed(offset) => {
                let fixed = instant.with_timezone(offset);
                (fixed.hour(), fixed.minute())
            }
        };

        Ok(format!("{hour}:{minute:02}"))
    }

    /// Signed whole-minute difference `delayed - scheduled`.
    ///
    /// Empty when the two instants are identical, `+N` when late, `-N` when
    /// early. See [`delay_label_from_millis`].
    pub fn delay_label(&self, delayed: &str, scheduled: &str) -> Result<String, TimeError> {
        let difference = self.parse(delayed)? - self.parse(scheduled)?;
        Ok(delay_label_from_millis(difference.num_milliseconds()))
    }
}

/// Render a millisecond difference as a delay label.
///
/// The minute count is the floor of the absolute difference, re-signed, so
/// 59 seconds late is `+0` and only an exact match is empty.
///
/// ```
/// use departure_relay::domain::delay_label_from_millis;
///
/// assert_eq!(delay_label_from_millis(0), "");
/// assert_eq!(delay_label_from_millis(300_000), "+5");
/// assert_eq!(delay_label_from_millis(-119_999), "-1");
/// assert_eq!(delay_label_from_millis(59_000), "+0");
/// ```
pub fn delay_label_from_millis(diff_ms: i64) -> String {
    if diff_ms == 0 {
        return String::new();
    }

    let sign = if diff_ms < 0 { '-' } else { '+' };
    format!("{sign}{}", diff_ms.unsigned_abs() / 60_000)
}
