use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub opd_slot_timezone: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            opd_slot_timezone: "UTC".to_string(),
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock PostgREST server, e.g. `MockServer::uri()`.
    pub fn with_supabase_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            opd_slot_timezone: self.opd_slot_timezone.clone(),
            server_port: 3000,
        }
    }
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    /// A row of the `offline_meets` table as PostgREST returns it.
    pub fn appointment_row(
        id: &str,
        doctor_id: &str,
        dept_id: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Value {
        json!({
            "id": id,
            "dept_id": dept_id,
            "doctor_id": doctor_id,
            "patient_id": Uuid::new_v4().to_string(),
            "from": from,
            "to": to,
            "created_at": "2025-01-01T08:00:00Z"
        })
    }

    /// A `hospitals` row with its embedded `hospital_departments`.
    pub fn hospital_with_departments(hospital_id: &str, department_ids: &[&str]) -> Value {
        let departments: Vec<Value> = department_ids
            .iter()
            .map(|id| json!({ "id": id }))
            .collect();

        json!({
            "id": hospital_id,
            "hospital_departments": departments
        })
    }

    pub fn error_response(message: &str, code: &str) -> Value {
        json!({
            "message": message,
            "code": code
        })
    }
}
