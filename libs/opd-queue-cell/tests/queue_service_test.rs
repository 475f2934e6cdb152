use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use opd_queue_cell::{
    Appointment, AppointmentFilter, AppointmentStore, InMemoryAppointmentStore,
    InvalidSlotTimezone, OpdQueueError, OpdQueueService, SlotClock, TimeSlotLabel,
};
use shared_utils::test_utils::TestConfig;

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, minute, 0).unwrap()
}

fn appointment(
    id: &str,
    doctor_id: &str,
    dept_id: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
) -> Appointment {
    Appointment {
        id: id.to_string(),
        dept_id: dept_id.to_string(),
        doctor_id: doctor_id.to_string(),
        patient_id: format!("patient-{}", id),
        from,
        to,
        created_at: Some(created_at),
    }
}

fn service_with(store: InMemoryAppointmentStore) -> OpdQueueService {
    OpdQueueService::new(Arc::new(store), SlotClock::utc())
}

/// Counts calls and answers with fixed data.
struct CountingStore {
    departments: Option<Vec<String>>,
    appointment_calls: AtomicUsize,
    department_calls: AtomicUsize,
}

impl CountingStore {
    fn with_departments(departments: Option<Vec<String>>) -> Self {
        Self {
            departments,
            appointment_calls: AtomicUsize::new(0),
            department_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AppointmentStore for CountingStore {
    async fn find_appointments(
        &self,
        _filter: &AppointmentFilter,
        _auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>> {
        self.appointment_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    async fn find_departments_for_hospital(
        &self,
        _hospital_id: &str,
        _auth_token: Option<&str>,
    ) -> Result<Option<Vec<String>>> {
        self.department_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.departments.clone())
    }
}

struct FailingStore;

#[async_trait]
impl AppointmentStore for FailingStore {
    async fn find_appointments(
        &self,
        _filter: &AppointmentFilter,
        _auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn find_departments_for_hospital(
        &self,
        _hospital_id: &str,
        _auth_token: Option<&str>,
    ) -> Result<Option<Vec<String>>> {
        Err(anyhow!("connection reset by peer"))
    }
}

/// Never answers; records whether the pending fetch was dropped.
struct HangingStore {
    released: Arc<Notify>,
    dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AppointmentStore for HangingStore {
    async fn find_appointments(
        &self,
        _filter: &AppointmentFilter,
        _auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>> {
        let _flag = DropFlag(self.dropped.clone());
        self.released.notified().await;
        Ok(Vec::new())
    }

    async fn find_departments_for_hospital(
        &self,
        _hospital_id: &str,
        _auth_token: Option<&str>,
    ) -> Result<Option<Vec<String>>> {
        Ok(None)
    }
}

#[tokio::test]
async fn test_doctor_queue_scenario_single_hour() {
    let store = InMemoryAppointmentStore::new().with_appointments(vec![appointment(
        "a-1",
        "doc-1",
        "dept-1",
        Some(at(1, 9, 15)),
        Some(at(1, 9, 45)),
        at(1, 8, 0),
    )]);

    let snapshot = service_with(store)
        .queue_for_doctor("doc-1", "dept-1", None)
        .await
        .unwrap();

    assert_eq!(snapshot.queue.len(), 1);
    let labels: Vec<String> = snapshot.per_hour_queue.labels().map(|l| l.to_string()).collect();
    assert_eq!(labels, vec!["9:00 - 10:00"]);
    assert_eq!(snapshot.per_hour_queue.get(&TimeSlotLabel::new(9)).unwrap()[0].id, "a-1");
}

#[tokio::test]
async fn test_doctor_queue_scenario_spanning() {
    let store = InMemoryAppointmentStore::new().with_appointments(vec![appointment(
        "a-1",
        "doc-1",
        "dept-1",
        Some(at(1, 9, 45)),
        Some(at(1, 11, 5)),
        at(1, 8, 0),
    )]);

    let snapshot = service_with(store)
        .queue_for_doctor("doc-1", "dept-1", None)
        .await
        .unwrap();

    let labels: Vec<String> = snapshot.per_hour_queue.labels().map(|l| l.to_string()).collect();
    assert_eq!(labels, vec!["9:00 - 10:00", "11:00 - 12:00"]);
    assert!(snapshot.per_hour_queue.get(&TimeSlotLabel::new(10)).is_none());
    assert_eq!(snapshot.queue.len(), 1);
}

#[tokio::test]
async fn test_doctor_queue_filters_by_doctor_and_department() {
    let store = InMemoryAppointmentStore::new().with_appointments(vec![
        appointment("mine", "doc-1", "dept-1", Some(at(1, 10, 0)), Some(at(1, 10, 15)), at(1, 7, 0)),
        appointment("other-dept", "doc-1", "dept-2", Some(at(1, 10, 0)), Some(at(1, 10, 15)), at(1, 7, 1)),
        appointment("other-doc", "doc-2", "dept-1", Some(at(1, 10, 0)), Some(at(1, 10, 15)), at(1, 7, 2)),
    ]);

    let snapshot = service_with(store)
        .queue_for_doctor("doc-1", "dept-1", None)
        .await
        .unwrap();

    let ids: Vec<&str> = snapshot.queue.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["mine"]);
}

#[tokio::test]
async fn test_queue_is_newest_first_and_buckets_follow_queue_order() {
    let store = InMemoryAppointmentStore::new().with_appointments(vec![
        appointment("older", "doc-1", "dept-1", Some(at(1, 14, 0)), Some(at(1, 14, 20)), at(1, 6, 0)),
        appointment("newer", "doc-1", "dept-1", Some(at(1, 14, 30)), Some(at(1, 14, 50)), at(1, 7, 0)),
    ]);

    let snapshot = service_with(store)
        .queue_for_department("dept-1", None)
        .await
        .unwrap();

    let queue_ids: Vec<&str> = snapshot.queue.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(queue_ids, vec!["newer", "older"]);

    let bucket_ids: Vec<&str> = snapshot
        .per_hour_queue
        .get(&TimeSlotLabel::new(14))
        .unwrap()
        .iter()
        .map(|a| a.id.as_str())
        .collect();
    assert_eq!(bucket_ids, queue_ids);
}

#[tokio::test]
async fn test_hospital_queue_matches_any_department() {
    let store = InMemoryAppointmentStore::new()
        .with_hospital("h-1", &["dept-1", "dept-2"])
        .with_appointments(vec![
            appointment("cardio", "doc-1", "dept-1", Some(at(1, 9, 0)), Some(at(1, 9, 30)), at(1, 6, 0)),
            appointment("ortho", "doc-2", "dept-2", None, None, at(1, 6, 1)),
            appointment("elsewhere", "doc-3", "dept-9", Some(at(1, 9, 0)), Some(at(1, 9, 30)), at(1, 6, 2)),
        ]);

    let snapshot = service_with(store).queue_for_hospital("h-1", None).await.unwrap();

    let mut ids: Vec<&str> = snapshot.queue.iter().map(|a| a.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["cardio", "ortho"]);
    assert_eq!(snapshot.per_hour_queue.get(&TimeSlotLabel::midnight()).unwrap()[0].id, "ortho");
}

#[tokio::test]
async fn test_hospital_with_departments_but_no_appointments_is_empty_success() {
    let store = InMemoryAppointmentStore::new().with_hospital("h-1", &["dept-1"]);

    let snapshot = service_with(store).queue_for_hospital("h-1", None).await.unwrap();

    assert!(snapshot.queue.is_empty());
    assert!(snapshot.per_hour_queue.is_empty());
}

#[tokio::test]
async fn test_hospital_without_departments_skips_appointment_fetch() {
    let store = Arc::new(CountingStore::with_departments(None));
    let service = OpdQueueService::new(store.clone(), SlotClock::utc());

    let result = service.queue_for_hospital("h-unknown", None).await;

    assert_matches!(result, Err(OpdQueueError::NoDepartments { hospital_id }) if hospital_id == "h-unknown");
    assert_eq!(store.department_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.appointment_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_hospital_with_empty_department_list_is_rejected() {
    let store = Arc::new(CountingStore::with_departments(Some(Vec::new())));
    let service = OpdQueueService::new(store.clone(), SlotClock::utc());

    let result = service.queue_for_hospital("h-1", None).await;

    assert_matches!(result, Err(OpdQueueError::NoDepartments { .. }));
    assert_eq!(store.appointment_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_store_errors_propagate_without_retry() {
    let service = OpdQueueService::new(Arc::new(FailingStore), SlotClock::utc());

    assert_matches!(
        service.queue_for_department("dept-1", None).await,
        Err(OpdQueueError::Store(e)) if e.to_string().contains("connection reset")
    );
    assert_matches!(service.queue_for_hospital("h-1", None).await, Err(OpdQueueError::Store(_)));
    assert_matches!(service.appointments_for_doctor("doc-1", None).await, Err(OpdQueueError::Store(_)));
}

#[tokio::test]
async fn test_doctor_appointments_list_ignores_department() {
    let store = InMemoryAppointmentStore::new().with_appointments(vec![
        appointment("a", "doc-1", "dept-1", None, None, at(1, 6, 0)),
        appointment("b", "doc-1", "dept-2", None, None, at(1, 6, 1)),
        appointment("c", "doc-2", "dept-1", None, None, at(1, 6, 2)),
    ]);

    let appointments = service_with(store).appointments_for_doctor("doc-1", None).await.unwrap();

    let ids: Vec<&str> = appointments.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
}

#[tokio::test]
async fn test_concurrent_queries_are_independent() {
    let store = InMemoryAppointmentStore::new()
        .with_hospital("h-1", &["dept-1"])
        .with_appointments(vec![
            appointment("a", "doc-1", "dept-1", Some(at(1, 8, 0)), Some(at(1, 9, 0)), at(1, 6, 0)),
            appointment("b", "doc-2", "dept-2", Some(at(1, 12, 0)), Some(at(1, 12, 10)), at(1, 6, 1)),
        ]);
    let service = service_with(store);

    let (dept_one, dept_two, hospital) = futures::join!(
        service.queue_for_department("dept-1", None),
        service.queue_for_department("dept-2", None),
        service.queue_for_hospital("h-1", None),
    );

    assert_eq!(dept_one.unwrap().per_hour_queue.entry_count(), 2);
    assert_eq!(dept_two.unwrap().per_hour_queue.entry_count(), 1);
    assert_eq!(hospital.unwrap().queue[0].id, "a");
}

#[tokio::test]
async fn test_abandoned_query_drops_pending_fetch() {
    let dropped = Arc::new(AtomicBool::new(false));
    let store = HangingStore {
        released: Arc::new(Notify::new()),
        dropped: dropped.clone(),
    };
    let service = OpdQueueService::new(Arc::new(store), SlotClock::utc());

    let outcome = tokio::time::timeout(
        Duration::from_millis(50),
        service.queue_for_department("dept-1", None),
    )
    .await;

    assert!(outcome.is_err());
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_service_uses_configured_clock() {
    let store = InMemoryAppointmentStore::new().with_appointments(vec![appointment(
        "a",
        "doc-1",
        "dept-1",
        Some(at(1, 4, 0)),
        Some(at(1, 4, 20)),
        at(1, 3, 0),
    )]);
    let service = OpdQueueService::new(Arc::new(store), SlotClock::from_setting("+05:30").unwrap());

    let snapshot = service.queue_for_department("dept-1", None).await.unwrap();

    assert_eq!(service.clock().zone(), "+05:30");
    assert!(snapshot.per_hour_queue.get(&TimeSlotLabel::new(9)).is_some());
}

#[test]
fn test_from_config_rejects_unknown_timezone() {
    let mut config = TestConfig::default();
    config.opd_slot_timezone = "Mars/Olympus".to_string();

    let result = OpdQueueService::from_config(&config.to_app_config());

    assert_matches!(result, Err(InvalidSlotTimezone(setting)) if setting == "Mars/Olympus");
}

#[test]
fn test_from_config_accepts_offset_timezone() {
    let mut config = TestConfig::default();
    config.opd_slot_timezone = "-03:00".to_string();

    let service = OpdQueueService::from_config(&config.to_app_config()).unwrap();

    assert_eq!(service.clock().zone(), "-03:00");
}
