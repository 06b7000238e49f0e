use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{Appointment, BookSlotRequest, BookingError};
use crate::services::booking::BookingService;

fn map_booking_error(e: BookingError) -> AppError {
    match e {
        BookingError::DoctorUnavailable => {
            AppError::NotFound(e.to_string())
        },
        BookingError::SlotNotOpen { .. } => {
            AppError::BadRequest(e.to_string())
        },
        BookingError::SlotAlreadyBooked { .. } => {
            AppError::Conflict(e.to_string())
        },
        BookingError::InvalidRequest(msg) => {
            AppError::BadRequest(msg)
        },
        BookingError::NotFound => {
            AppError::NotFound("Appointment not found".to_string())
        },
        BookingError::BookingFailed(msg) | BookingError::DatabaseError(msg) => {
            AppError::Internal(msg)
        },
    }
}

fn is_participant(user: &User, appointment: &Appointment) -> bool {
    user.id == appointment.patient_id.to_string()
        || user.id == appointment.doctor_id.to_string()
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// Book a slot for the authenticated patient. The appointment is always
/// recorded against the caller's identity; booking on another patient's
/// behalf is not supported.
#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if !user.is_patient() {
        return Err(AppError::Auth("Only patients can book appointments".to_string()));
    }

    let booking_service = BookingService::new(&state);

    let appointment = booking_service.book_slot(&user, request, token).await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment_id": appointment.id,
        "appointment": appointment,
        "message": "Appointment confirmed"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();
    let booking_service = BookingService::new(&state);

    let appointment = booking_service.get_appointment(appointment_id, token).await
        .map_err(map_booking_error)?;

    if !is_participant(&user, &appointment) && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this appointment".to_string()));
    }

    Ok(Json(json!({
        "success": true,
        "appointment": appointment
    })))
}

/// Patient visit history.
#[axum::debug_handler]
pub async fn list_patient_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    if user.id != patient_id.to_string() && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this patient's appointments".to_string()));
    }

    let booking_service = BookingService::new(&state);

    let appointments = booking_service.list_patient_appointments(patient_id, token).await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

/// Doctor worklist: confirmed appointments assigned to the doctor.
#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let token = auth.token();

    let is_self = user.is_doctor() && user.id == doctor_id.to_string();
    if !is_self && !user.is_admin() {
        return Err(AppError::Auth("Not authorized to view this doctor's appointments".to_string()));
    }

    let booking_service = BookingService::new(&state);

    let appointments = booking_service.list_doctor_appointments(doctor_id, token).await
        .map_err(map_booking_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}
