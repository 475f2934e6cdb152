// =====================================================================================
// OPD QUEUE CELL - HOURLY QUEUE BUCKETING FOR DOCTOR, DEPARTMENT AND HOSPITAL VIEWS
// =====================================================================================

pub mod models;
pub mod error;
pub mod services;
pub mod handlers;
pub mod router;

pub use models::*;
pub use error::*;
pub use services::*;
pub use router::create_opd_queue_router;
