use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    http::Uri,
};

use opd_queue_cell::{create_opd_queue_router, OpdQueueService};
use shared_models::error::AppError;

pub fn create_router(queue_service: Arc<OpdQueueService>) -> Router {
    Router::new()
        .route("/", get(|| async { "OPD Queue API is running!" }))
        .nest("/opd", create_opd_queue_router(queue_service))
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
