use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;
use thiserror::Error;

use doctor_cell::models::SlotKey;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// One row of the `appointments` table. Rows are immutable once created;
/// the booking transaction is the only writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub patient_name: String,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub department: Option<String>,
    pub date: NaiveDate,
    pub slot: SlotKey,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// The only status the booking core produces. Cancellation and
    /// completion are future scope.
    Confirmed,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot: SlotKey,
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Booking failure taxonomy. Every variant names the violated constraint so
/// the caller can refresh exactly the affected slot rather than the whole
/// calendar.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Doctor is not available for booking")]
    DoctorUnavailable,

    #[error("Slot {slot} on {date} is not open for booking")]
    SlotNotOpen { date: NaiveDate, slot: SlotKey },

    #[error("Slot {slot} on {date} is already booked")]
    SlotAlreadyBooked { date: NaiveDate, slot: SlotKey },

    #[error("Invalid booking request: {0}")]
    InvalidRequest(String),

    #[error("Booking failed: {0}")]
    BookingFailed(String),

    #[error("Appointment not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
