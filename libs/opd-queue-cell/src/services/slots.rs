use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Local, Timelike, Utc};

use crate::error::InvalidSlotTimezone;
use crate::models::{SlotSpan, TimeSlotLabel};

type HourFn = dyn Fn(DateTime<Utc>) -> u32 + Send + Sync;

/// Decides which hour of the day an instant falls in.
///
/// The zone is an explicit choice of the caller: UTC, the server's local
/// zone, a fixed offset, or any custom hour function.
#[derive(Clone)]
pub struct SlotClock {
    hour_of: Arc<HourFn>,
    zone: String,
}

impl SlotClock {
    pub fn utc() -> Self {
        Self {
            hour_of: Arc::new(|instant: DateTime<Utc>| instant.hour()),
            zone: "UTC".to_string(),
        }
    }

    pub fn server_local() -> Self {
        Self {
            hour_of: Arc::new(|instant: DateTime<Utc>| instant.with_timezone(&Local).hour()),
            zone: "local".to_string(),
        }
    }

    pub fn fixed_offset(offset: FixedOffset) -> Self {
        Self {
            hour_of: Arc::new(move |instant: DateTime<Utc>| instant.with_timezone(&offset).hour()),
            zone: offset.to_string(),
        }
    }

    pub fn from_fn<F>(zone: &str, hour_of: F) -> Self
    where
        F: Fn(DateTime<Utc>) -> u32 + Send + Sync + 'static,
    {
        Self {
            hour_of: Arc::new(hour_of),
            zone: zone.to_string(),
        }
    }

    /// Parses `"UTC"`, `"local"` or a `±HH:MM` offset.
    pub fn from_setting(setting: &str) -> Result<Self, InvalidSlotTimezone> {
        let trimmed = setting.trim();

        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") {
            return Ok(Self::utc());
        }
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::server_local());
        }

        parse_offset(trimmed)
            .map(Self::fixed_offset)
            .ok_or_else(|| InvalidSlotTimezone(setting.to_string()))
    }

    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Hourly label of `instant`.
    pub fn label(&self, instant: DateTime<Utc>) -> TimeSlotLabel {
        // Custom hour functions are expected to stay within one day.
        TimeSlotLabel::new((self.hour_of)(instant) % 24)
    }

    fn label_or_midnight(&self, instant: Option<DateTime<Utc>>) -> TimeSlotLabel {
        instant.map_or_else(TimeSlotLabel::midnight, |instant| self.label(instant))
    }

    /// Start-hour and end-hour labels of an appointment.
    ///
    /// Only the two endpoints are sampled: 9:45 to 11:05 yields the 9 and 11
    /// labels, never 10. A missing instant counts as hour 0.
    pub fn labels_for(&self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> SlotSpan {
        SlotSpan::new(self.label_or_midnight(from), self.label_or_midnight(to))
    }
}

impl Default for SlotClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Debug for SlotClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotClock").field("zone", &self.zone).finish()
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, rest) = match *raw.as_bytes().first()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..=23).contains(&hours) || !(0..=59).contains(&minutes) {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
