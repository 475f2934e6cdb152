use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::{typed_header::TypedHeaderRejection, TypedHeader};
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use tracing::{error, info};

use shared_models::error::AppError;

use crate::models::QueueResponse;
use crate::services::OpdQueueService;

/// A missing or non-Bearer `Authorization` header is treated as no token.
type BearerHeader = Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>;

fn bearer_token(auth: &BearerHeader) -> Option<&str> {
    auth.as_ref().ok().map(|TypedHeader(auth)| auth.token())
}

/// Hourly queue of one doctor within one department
#[axum::debug_handler]
pub async fn get_doctor_queue(
    State(service): State<Arc<OpdQueueService>>,
    auth: BearerHeader,
    Path((doctor_id, dept_id)): Path<(String, String)>,
) -> Result<Json<QueueResponse>, AppError> {
    info!("OPD queue request for doctor {} in department {}", doctor_id, dept_id);

    let snapshot = service
        .queue_for_doctor(&doctor_id, &dept_id, bearer_token(&auth))
        .await?;

    Ok(Json(snapshot.into()))
}

/// Hourly queue of one department
#[axum::debug_handler]
pub async fn get_department_queue(
    State(service): State<Arc<OpdQueueService>>,
    auth: BearerHeader,
    Path(dept_id): Path<String>,
) -> Result<Json<QueueResponse>, AppError> {
    info!("OPD queue request for department {}", dept_id);

    let snapshot = service
        .queue_for_department(&dept_id, bearer_token(&auth))
        .await?;

    Ok(Json(snapshot.into()))
}

/// Hourly queue across all departments of a hospital
#[axum::debug_handler]
pub async fn get_hospital_queue(
    State(service): State<Arc<OpdQueueService>>,
    auth: BearerHeader,
    Path(hospital_id): Path<String>,
) -> Result<Json<QueueResponse>, AppError> {
    info!("OPD queue request for hospital {}", hospital_id);

    let snapshot = service
        .queue_for_hospital(&hospital_id, bearer_token(&auth))
        .await?;

    Ok(Json(snapshot.into()))
}

/// Flat appointment list of a doctor, served on both GET and POST
#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(service): State<Arc<OpdQueueService>>,
    auth: BearerHeader,
    Path(doctor_id): Path<String>,
) -> (StatusCode, Json<Value>) {
    info!("Appointment list request for doctor {}", doctor_id);

    match service.appointments_for_doctor(&doctor_id, bearer_token(&auth)).await {
        Ok(appointments) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": { "docAppointments": appointments }
            })),
        ),
        Err(e) => {
            error!("Failed to load appointments for doctor {}: {}", doctor_id, e);
            (StatusCode::BAD_GATEWAY, Json(json!({ "success": false })))
        }
    }
}
