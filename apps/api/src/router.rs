use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Hospital API is running!" }))
        .nest("/api/v1/doctors", doctor_routes(state.clone()))
        .nest("/api/v1/appointments", appointment_routes(state.clone()))
}
