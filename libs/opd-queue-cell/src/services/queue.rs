use std::sync::Arc;

use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::error::{InvalidSlotTimezone, OpdQueueError};
use crate::models::{Appointment, AppointmentFilter, QueueSnapshot};
use crate::services::buckets::aggregate;
use crate::services::slots::SlotClock;
use crate::services::store::{AppointmentStore, InMemoryAppointmentStore, SupabaseAppointmentStore};

/// Fetches appointments for a doctor, department or hospital and buckets
/// them by hour.
///
/// Stateless between calls; the only suspension point is the store fetch.
#[derive(Clone)]
pub struct OpdQueueService {
    store: Arc<dyn AppointmentStore>,
    clock: SlotClock,
}

impl std::fmt::Debug for OpdQueueService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpdQueueService").finish_non_exhaustive()
    }
}

impl OpdQueueService {
    pub fn new(store: Arc<dyn AppointmentStore>, clock: SlotClock) -> Self {
        Self { store, clock }
    }

    /// Supabase-backed service, or an empty in-memory one when persistence
    /// is not configured.
    pub fn from_config(config: &AppConfig) -> Result<Self, InvalidSlotTimezone> {
        let clock = SlotClock::from_setting(&config.opd_slot_timezone)?;

        let store: Arc<dyn AppointmentStore> = if config.is_configured() {
            Arc::new(SupabaseAppointmentStore::new(config))
        } else {
            warn!("Supabase not configured, serving OPD queues from an empty in-memory store");
            Arc::new(InMemoryAppointmentStore::new())
        };

        Ok(Self::new(store, clock))
    }

    pub fn clock(&self) -> &SlotClock {
        &self.clock
    }

    pub async fn queue_for(
        &self,
        filter: &AppointmentFilter,
        auth_token: Option<&str>,
    ) -> Result<QueueSnapshot, OpdQueueError> {
        let queue = self.store.find_appointments(filter, auth_token).await?;
        let per_hour_queue = aggregate(&self.clock, &queue);

        debug!(
            "Bucketed {} appointments into {} hourly slots ({})",
            queue.len(),
            per_hour_queue.len(),
            self.clock.zone()
        );

        Ok(QueueSnapshot { per_hour_queue, queue })
    }

    pub async fn queue_for_doctor(
        &self,
        doctor_id: &str,
        dept_id: &str,
        auth_token: Option<&str>,
    ) -> Result<QueueSnapshot, OpdQueueError> {
        self.queue_for(&AppointmentFilter::for_doctor_in_department(doctor_id, dept_id), auth_token)
            .await
    }

    pub async fn queue_for_department(
        &self,
        dept_id: &str,
        auth_token: Option<&str>,
    ) -> Result<QueueSnapshot, OpdQueueError> {
        self.queue_for(&AppointmentFilter::for_department(dept_id), auth_token)
            .await
    }

    /// Queue across every department of a hospital.
    ///
    /// A hospital with no departments is an error rather than an empty queue.
    pub async fn queue_for_hospital(
        &self,
        hospital_id: &str,
        auth_token: Option<&str>,
    ) -> Result<QueueSnapshot, OpdQueueError> {
        let dept_ids = match self.store.find_departments_for_hospital(hospital_id, auth_token).await? {
            Some(dept_ids) if !dept_ids.is_empty() => dept_ids,
            _ => {
                warn!("Hospital {} has no departments", hospital_id);
                return Err(OpdQueueError::NoDepartments {
                    hospital_id: hospital_id.to_string(),
                });
            }
        };

        debug!("Hospital {} has {} departments", hospital_id, dept_ids.len());
        self.queue_for(&AppointmentFilter::for_departments(dept_ids), auth_token)
            .await
    }

    /// Every appointment of a doctor, unbucketed.
    pub async fn appointments_for_doctor(
        &self,
        doctor_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>, OpdQueueError> {
        let appointments = self
            .store
            .find_appointments(&AppointmentFilter::for_doctor(doctor_id), auth_token)
            .await?;
        Ok(appointments)
    }
}
