use crate::models::{Appointment, BucketMap};
use crate::services::slots::SlotClock;

/// Groups appointments into hourly buckets.
///
/// Each appointment lands in its start-hour bucket and, when the end hour
/// differs, also in its end-hour bucket. Within a bucket appointments keep
/// their input order.
pub fn aggregate(clock: &SlotClock, appointments: &[Appointment]) -> BucketMap {
    aggregate_where(clock, appointments, |_| true)
}

/// [`aggregate`] over the appointments accepted by `predicate`.
pub fn aggregate_where<P>(clock: &SlotClock, appointments: &[Appointment], predicate: P) -> BucketMap
where
    P: Fn(&Appointment) -> bool,
{
    appointments
        .iter()
        .filter(|appointment| predicate(appointment))
        .fold(BucketMap::new(), |buckets, appointment| bucket_into(clock, buckets, appointment))
}

fn bucket_into(clock: &SlotClock, mut buckets: BucketMap, appointment: &Appointment) -> BucketMap {
    let span = clock.labels_for(appointment.from, appointment.to);

    buckets.push(span.primary, appointment.clone());
    if span.spans_multiple {
        buckets.push(span.secondary, appointment.clone());
    }

    buckets
}
