use std::sync::Arc;
use axum::{
    Router,
    routing::get,
};

use crate::handlers::{
    get_doctor_queue,
    get_department_queue,
    get_hospital_queue,
    list_doctor_appointments,
};
use crate::services::OpdQueueService;

pub fn create_opd_queue_router(service: Arc<OpdQueueService>) -> Router {
    Router::new()
        .route("/doctors/{doctor_id}/departments/{dept_id}/queue", get(get_doctor_queue))
        .route(
            "/doctors/{doctor_id}/appointments",
            get(list_doctor_appointments).post(list_doctor_appointments),
        )
        .route("/departments/{dept_id}/queue", get(get_department_queue))
        .route("/hospitals/{hospital_id}/queue", get(get_hospital_queue))
        .with_state(service)
}
