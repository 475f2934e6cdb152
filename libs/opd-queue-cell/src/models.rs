use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de, ser::SerializeMap, Deserialize, Deserializer, Serialize, Serializer};

// ==============================================================================
// APPOINTMENT
// ==============================================================================

/// An out-patient appointment as stored by the clinic. Read-only here.
///
/// Serializes with the camelCase field names the queue views consume and
/// accepts the snake_case column names PostgREST returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    #[serde(alias = "dept_id")]
    pub dept_id: String,
    #[serde(alias = "doctor_id")]
    pub doctor_id: String,
    #[serde(alias = "patient_id")]
    pub patient_id: String,
    /// Not guaranteed to be before `to`.
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_instant")]
    pub to: Option<DateTime<Utc>>,
    #[serde(default, alias = "created_at", deserialize_with = "deserialize_instant")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Zone-less forms written by `timestamp without time zone` columns.
const NAIVE_INSTANT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses an RFC 3339 instant, or a naive ISO-8601 date-time read as UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }

    NAIVE_INSTANT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;

    raw.map(|raw| {
        parse_instant(&raw).ok_or_else(|| <D::Error as de::Error>::custom(format!("invalid timestamp: {}", raw)))
    })
    .transpose()
}

// ==============================================================================
// TIME SLOTS
// ==============================================================================

/// One hour of the day, rendered as `"{h}:00 - {h+1}:00"`.
///
/// Hour 23 renders as `"23:00 - 24:00"`; there is no wraparound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeSlotLabel {
    hour: u32,
}

impl TimeSlotLabel {
    pub fn new(hour: u32) -> Self {
        Self { hour }
    }

    /// Label used when an appointment has no `from` or `to`.
    pub fn midnight() -> Self {
        Self::new(0)
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }
}

impl fmt::Display for TimeSlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:00 - {}:00", self.hour, self.hour + 1)
    }
}

impl Serialize for TimeSlotLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The start-hour and end-hour labels of one appointment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSpan {
    /// Label of `from`.
    pub primary: TimeSlotLabel,
    /// Label of `to`.
    pub secondary: TimeSlotLabel,
    pub spans_multiple: bool,
}

impl SlotSpan {
    pub fn new(primary: TimeSlotLabel, secondary: TimeSlotLabel) -> Self {
        Self {
            primary,
            secondary,
            spans_multiple: primary != secondary,
        }
    }
}

// ==============================================================================
// BUCKET MAP
// ==============================================================================

/// Hourly label to appointments, iterated in the order labels were first seen.
///
/// An appointment may sit in two buckets; nothing is deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketMap {
    buckets: Vec<(TimeSlotLabel, Vec<Appointment>)>,
}

impl BucketMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `label` with an empty bucket if it is not present yet.
    pub fn ensure(&mut self, label: TimeSlotLabel) -> &mut Vec<Appointment> {
        // At most 24 labels, a scan is fine.
        let index = match self.buckets.iter().position(|(existing, _)| *existing == label) {
            Some(index) => index,
            None => {
                self.buckets.push((label, Vec::new()));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[index].1
    }

    pub fn push(&mut self, label: TimeSlotLabel, appointment: Appointment) {
        self.ensure(label).push(appointment);
    }

    pub fn get(&self, label: &TimeSlotLabel) -> Option<&[Appointment]> {
        self.buckets
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, appointments)| appointments.as_slice())
    }

    pub fn labels(&self) -> impl Iterator<Item = &TimeSlotLabel> {
        self.buckets.iter().map(|(label, _)| label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TimeSlotLabel, &[Appointment])> {
        self.buckets
            .iter()
            .map(|(label, appointments)| (label, appointments.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of bucket entries, counting spanning appointments twice.
    pub fn entry_count(&self) -> usize {
        self.buckets.iter().map(|(_, appointments)| appointments.len()).sum()
    }
}

impl Serialize for BucketMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (label, appointments) in &self.buckets {
            map.serialize_entry(label, appointments)?;
        }
        map.end()
    }
}

// ==============================================================================
// QUERIES
// ==============================================================================

/// Which appointments a queue covers. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub doctor_id: Option<String>,
    pub dept_id: Option<String>,
    /// Set membership: the appointment's department must be one of these.
    pub dept_ids: Option<Vec<String>>,
}

impl AppointmentFilter {
    pub fn for_doctor_in_department(doctor_id: &str, dept_id: &str) -> Self {
        Self {
            doctor_id: Some(doctor_id.to_string()),
            dept_id: Some(dept_id.to_string()),
            dept_ids: None,
        }
    }

    pub fn for_doctor(doctor_id: &str) -> Self {
        Self {
            doctor_id: Some(doctor_id.to_string()),
            ..Self::default()
        }
    }

    pub fn for_department(dept_id: &str) -> Self {
        Self {
            dept_id: Some(dept_id.to_string()),
            ..Self::default()
        }
    }

    pub fn for_departments(dept_ids: Vec<String>) -> Self {
        Self {
            dept_ids: Some(dept_ids),
            ..Self::default()
        }
    }

    pub fn matches(&self, appointment: &Appointment) -> bool {
        let doctor_ok = self
            .doctor_id
            .as_ref()
            .map_or(true, |id| *id == appointment.doctor_id);
        let dept_ok = self
            .dept_id
            .as_ref()
            .map_or(true, |id| *id == appointment.dept_id);
        let dept_set_ok = self
            .dept_ids
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| *id == appointment.dept_id));

        doctor_ok && dept_ok && dept_set_ok
    }
}

/// Bucketed and flat views of one queue query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub per_hour_queue: BucketMap,
    /// Newest first.
    pub queue: Vec<Appointment>,
}

/// JSON body of the queue endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub per_hour_queue: BucketMap,
    pub queue: Vec<Appointment>,
    pub status: u16,
}

impl From<QueueSnapshot> for QueueResponse {
    fn from(snapshot: QueueSnapshot) -> Self {
        Self {
            per_hour_queue: snapshot.per_hour_queue,
            queue: snapshot.queue,
            status: 200,
        }
    }
}
