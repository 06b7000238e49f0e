use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{DoctorError, SetAvailabilityRequest};
use crate::services::availability::AvailabilityService;
use crate::services::directory::DoctorDirectoryService;

#[derive(Debug, Deserialize)]
pub struct DoctorListQuery {
    pub department: Option<String>,
}

fn map_doctor_error(e: DoctorError) -> AppError {
    match e {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
        DoctorError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// PUBLIC DIRECTORY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<DoctorListQuery>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);

    let doctors = directory.list_doctors(query.department.as_deref(), None).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctors": doctors
    })))
}

#[axum::debug_handler]
pub async fn get_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);

    let doctor = directory.get_doctor(doctor_id, None).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor": doctor
    })))
}

/// Patient-facing 7-day booking grid: {date, slot, open, already_booked}.
#[axum::debug_handler]
pub async fn get_booking_schedule(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let directory = DoctorDirectoryService::new(&state);
    let availability = AvailabilityService::new(&state);

    // Surface a 404 for unknown doctors instead of an empty grid
    let doctor = directory.get_doctor(doctor_id, None).await
        .map_err(map_doctor_error)?;

    let today = chrono::Utc::now().date_naive();
    let days = availability.booking_schedule(doctor_id, today, None).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "doctor_name": doctor.full_name,
        "bookable": doctor.is_bookable(),
        "days": days
    })))
}

// ==============================================================================
// PROTECTED AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_my_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_self = user.id == doctor_id.to_string();
    if !is_self && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this doctor's availability".to_string()));
    }

    let availability = AvailabilityService::new(&state);
    let today = chrono::Utc::now().date_naive();

    let days = availability.week_schedule(doctor_id, today, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "doctor_id": doctor_id,
        "days": days
    })))
}

/// Availability submission: batch upsert of open/closed flags for the
/// rolling week. Only the owning doctor (or an admin) may write.
#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_self = user.is_doctor() && user.id == doctor_id.to_string();
    if !is_self && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to set availability for this doctor".to_string()));
    }

    let availability = AvailabilityService::new(&state);

    let updated = availability.set_availability(doctor_id, request, token).await
        .map_err(map_doctor_error)?;

    Ok(Json(json!({
        "success": true,
        "updated": updated,
        "message": "Availability updated"
    })))
}
