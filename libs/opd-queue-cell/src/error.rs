use thiserror::Error;

use shared_models::error::AppError;

/// Message the queue views expect when a hospital has no departments.
pub const INVALID_DEPARTMENTS_MESSAGE: &str = "Invalid departments array";

#[derive(Error, Debug)]
pub enum OpdQueueError {
    #[error("Hospital {hospital_id} has no departments configured")]
    NoDepartments { hospital_id: String },

    #[error("Appointment store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl From<OpdQueueError> for AppError {
    fn from(err: OpdQueueError) -> Self {
        match err {
            OpdQueueError::NoDepartments { .. } => {
                AppError::BadRequest(INVALID_DEPARTMENTS_MESSAGE.to_string())
            }
            OpdQueueError::Store(e) => AppError::ExternalService(e.to_string()),
        }
    }
}

/// Startup-only failure: an `OPD_SLOT_TIMEZONE` value that is neither
/// `UTC`, `local` nor a `±HH:MM` offset.
#[derive(Error, Debug)]
#[error("Invalid slot timezone setting: {0}")]
pub struct InvalidSlotTimezone(pub String);
