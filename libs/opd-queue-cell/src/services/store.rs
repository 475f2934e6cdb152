use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Appointment, AppointmentFilter};

/// Where appointments and hospital departments come from.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Appointments matching `filter`, newest `created_at` first.
    async fn find_appointments(
        &self,
        filter: &AppointmentFilter,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>>;

    /// Department ids of a hospital, or `None` when the hospital or its
    /// department list is unknown.
    async fn find_departments_for_hospital(
        &self,
        hospital_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<Vec<String>>>;
}

// ==============================================================================
// SUPABASE
// ==============================================================================

const APPOINTMENTS_PATH: &str = "/rest/v1/offline_meets";
const HOSPITALS_PATH: &str = "/rest/v1/hospitals";

#[derive(Debug, Deserialize)]
struct HospitalDepartmentsRow {
    #[serde(default)]
    hospital_departments: Option<Vec<DepartmentRef>>,
}

#[derive(Debug, Deserialize)]
struct DepartmentRef {
    id: String,
}

pub struct SupabaseAppointmentStore {
    supabase: SupabaseClient,
}

impl SupabaseAppointmentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn appointments_query(filter: &AppointmentFilter) -> String {
        let mut query_parts = vec![];

        if let Some(doctor_id) = &filter.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", urlencoding::encode(doctor_id)));
        }
        if let Some(dept_id) = &filter.dept_id {
            query_parts.push(format!("dept_id=eq.{}", urlencoding::encode(dept_id)));
        }
        if let Some(dept_ids) = &filter.dept_ids {
            let encoded: Vec<String> = dept_ids
                .iter()
                .map(|id| urlencoding::encode(id).into_owned())
                .collect();
            query_parts.push(format!("dept_id=in.({})", encoded.join(",")));
        }
        query_parts.push("order=created_at.desc".to_string());

        format!("{}?{}", APPOINTMENTS_PATH, query_parts.join("&"))
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn find_appointments(
        &self,
        filter: &AppointmentFilter,
        auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>> {
        let path = Self::appointments_query(filter);
        debug!("Fetching appointments: {}", path);

        let appointments: Vec<Appointment> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
        ).await?;

        Ok(appointments)
    }

    async fn find_departments_for_hospital(
        &self,
        hospital_id: &str,
        auth_token: Option<&str>,
    ) -> Result<Option<Vec<String>>> {
        debug!("Fetching departments for hospital: {}", hospital_id);

        let path = format!(
            "{}?id=eq.{}&select=id,hospital_departments(id)",
            HOSPITALS_PATH,
            urlencoding::encode(hospital_id)
        );
        let rows: Vec<HospitalDepartmentsRow> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
        ).await?;

        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.hospital_departments)
            .map(|departments| departments.into_iter().map(|d| d.id).collect()))
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

/// Store backed by plain vectors, for tests and runs without a database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAppointmentStore {
    appointments: Vec<Appointment>,
    hospitals: HashMap<String, Vec<String>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_appointments(mut self, appointments: Vec<Appointment>) -> Self {
        self.appointments.extend(appointments);
        self
    }

    pub fn with_hospital(mut self, hospital_id: &str, dept_ids: &[&str]) -> Self {
        self.hospitals.insert(
            hospital_id.to_string(),
            dept_ids.iter().map(|id| id.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn find_appointments(
        &self,
        filter: &AppointmentFilter,
        _auth_token: Option<&str>,
    ) -> Result<Vec<Appointment>> {
        let mut matching: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|appointment| filter.matches(appointment))
            .cloned()
            .collect();
        // Stable, so equal timestamps keep insertion order. Missing timestamps go last.
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching)
    }

    async fn find_departments_for_hospital(
        &self,
        hospital_id: &str,
        _auth_token: Option<&str>,
    ) -> Result<Option<Vec<String>>> {
        Ok(self.hospitals.get(hospital_id).cloned())
    }
}
