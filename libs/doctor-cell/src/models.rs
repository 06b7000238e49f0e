use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc, NaiveDate};
use std::fmt;
use thiserror::Error;

// ==============================================================================
// DOCTOR DIRECTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub full_name: String,
    pub department: Option<String>,
    pub experience_years: i32,
    /// A blacklisted doctor stays listed but cannot receive new bookings.
    pub is_blacklisted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn is_bookable(&self) -> bool {
        !self.is_blacklisted
    }
}

// ==============================================================================
// SLOT & AVAILABILITY MODELS
// ==============================================================================

/// System-wide slot keys. Every code path uses this one set; the stored
/// `slot` column holds the snake_case form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SlotKey {
    Morning,
    Evening,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKey::Morning => write!(f, "morning"),
            SlotKey::Evening => write!(f, "evening"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SlotDefinition {
    pub key: SlotKey,
    pub label: &'static str,
}

/// One row of the `doctor_availability` table. At most one row exists per
/// (doctor_id, date, slot); writes go through the upsert in
/// `AvailabilityService::set_availability`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRecord {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub slot: SlotKey,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityEntry {
    pub date: NaiveDate,
    pub slot: SlotKey,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAvailabilityRequest {
    pub entries: Vec<AvailabilityEntry>,
}

// ==============================================================================
// SCHEDULE VIEW MODELS
// ==============================================================================

/// Doctor-facing grid cell: what the doctor has opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotState {
    pub slot: SlotKey,
    pub label: String,
    pub is_open: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub weekday: String,
    pub slots: Vec<SlotState>,
}

/// Patient-facing grid cell: open/booked status drives which cells the UI
/// renders as bookable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSlotState {
    pub slot: SlotKey,
    pub label: String,
    pub open: bool,
    pub already_booked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingDaySchedule {
    pub date: NaiveDate,
    pub weekday: String,
    pub slots: Vec<BookingSlotState>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}
