use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn appointment_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::book_slot))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/patient/{patient_id}", get(handlers::list_patient_appointments))
        .route("/doctor/{doctor_id}", get(handlers::list_doctor_appointments))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
