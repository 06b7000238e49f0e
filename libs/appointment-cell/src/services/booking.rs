use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{ApiStatusError, SupabaseClient};
use shared_models::auth::User;
use doctor_cell::calendar;
use doctor_cell::services::availability::AvailabilityService;
use doctor_cell::services::directory::DoctorDirectoryService;

use crate::models::{Appointment, BookSlotRequest, BookingError};

/// The booking transaction manager. Validates a request against the doctor
/// directory and the availability store, then inserts the confirmed
/// appointment. The partial unique index on
/// (doctor_id, date, slot) WHERE status = 'confirmed' serializes concurrent
/// inserts for the same triple; an insert-time conflict surfaces as
/// `SlotAlreadyBooked`.
pub struct BookingService {
    supabase: SupabaseClient,
    directory: DoctorDirectoryService,
    availability: AvailabilityService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            directory: DoctorDirectoryService::new(config),
            availability: AvailabilityService::new(config),
        }
    }

    /// Book one slot for the authenticated patient. Exactly one of N
    /// concurrent calls for the same open (doctor, date, slot) succeeds.
    pub async fn book_slot(
        &self,
        patient: &User,
        request: BookSlotRequest,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        info!("Booking slot {} on {} with doctor {} for patient {}",
              request.slot, request.date, request.doctor_id, patient.id);

        // Step 1: request validation
        let patient_id = Uuid::parse_str(&patient.id)
            .map_err(|_| BookingError::InvalidRequest("Patient identity is not a valid UUID".to_string()))?;

        let today = Utc::now().date_naive();
        if !calendar::is_within_booking_window(today, request.date) {
            return Err(BookingError::InvalidRequest(format!(
                "Date {} is outside the {}-day booking window",
                request.date,
                calendar::BOOKING_HORIZON_DAYS
            )));
        }

        // Step 2: doctor must exist and not be blacklisted
        let doctor = self.directory.get_doctor(request.doctor_id, Some(auth_token)).await
            .map_err(|e| match e {
                doctor_cell::models::DoctorError::NotFound => BookingError::DoctorUnavailable,
                other => BookingError::BookingFailed(other.to_string()),
            })?;

        if !doctor.is_bookable() {
            warn!("Rejected booking against blacklisted doctor {}", doctor.id);
            return Err(BookingError::DoctorUnavailable);
        }

        // Step 3: the doctor must have opened the slot; absent rows are closed
        let open = self.availability
            .is_slot_open(request.doctor_id, request.date, request.slot, Some(auth_token))
            .await
            .map_err(|e| BookingError::BookingFailed(e.to_string()))?;

        if !open {
            return Err(BookingError::SlotNotOpen {
                date: request.date,
                slot: request.slot,
            });
        }

        // Step 4: re-check for an existing confirmed appointment right before
        // the insert; the unique index backs this up under concurrency
        if self.slot_is_taken(request.doctor_id, request.date, request.slot, auth_token).await? {
            warn!("Slot {} on {} for doctor {} already booked",
                  request.slot, request.date, request.doctor_id);
            return Err(BookingError::SlotAlreadyBooked {
                date: request.date,
                slot: request.slot,
            });
        }

        // Step 5: insert the confirmed appointment
        let appointment_data = json!({
            "patient_id": patient_id,
            "patient_name": patient.display_name(),
            "doctor_id": doctor.id,
            "doctor_name": doctor.full_name,
            "department": doctor.department,
            "date": request.date,
            "slot": request.slot,
            "status": "confirmed",
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/appointments",
            Some(auth_token),
            Some(appointment_data),
            Some(headers),
        ).await.map_err(|e| {
            // A unique-violation means a concurrent booking won the race
            if e.downcast_ref::<ApiStatusError>().is_some_and(|api| api.is_conflict()) {
                warn!("Lost booking race for slot {} on {} (doctor {})",
                      request.slot, request.date, request.doctor_id);
                BookingError::SlotAlreadyBooked {
                    date: request.date,
                    slot: request.slot,
                }
            } else {
                BookingError::BookingFailed(e.to_string())
            }
        })?;

        let row = result.into_iter().next()
            .ok_or_else(|| BookingError::BookingFailed("Insert returned no representation".to_string()))?;

        let appointment: Appointment = serde_json::from_value(row)
            .map_err(|e| BookingError::BookingFailed(format!("Failed to parse appointment: {}", e)))?;

        info!("Appointment {} confirmed for patient {} with doctor {}",
              appointment.id, patient_id, doctor.id);
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, BookingError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        let Some(row) = result.into_iter().next() else {
            return Err(BookingError::NotFound);
        };

        serde_json::from_value(row)
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    /// Patient visit history, most recent first.
    pub async fn list_patient_appointments(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        debug!("Listing appointments for patient: {}", patient_id);

        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=date.desc,created_at.desc",
            patient_id
        );
        self.fetch_appointments(&path, auth_token).await
    }

    /// Doctor worklist, upcoming dates first.
    pub async fn list_doctor_appointments(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        debug!("Listing appointments for doctor: {}", doctor_id);

        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=date.asc,slot.asc",
            doctor_id
        );
        self.fetch_appointments(&path, auth_token).await
    }

    async fn fetch_appointments(
        &self,
        path: &str,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, BookingError> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await.map_err(|e| BookingError::DatabaseError(e.to_string()))?;

        result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| BookingError::DatabaseError(format!("Failed to parse appointments: {}", e)))
    }

    async fn slot_is_taken(
        &self,
        doctor_id: Uuid,
        date: chrono::NaiveDate,
        slot: doctor_cell::models::SlotKey,
        auth_token: &str,
    ) -> Result<bool, BookingError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&slot=eq.{}&status=eq.confirmed&limit=1",
            doctor_id, date, slot
        );

        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await.map_err(|e| BookingError::BookingFailed(e.to_string()))?;

        Ok(!existing.is_empty())
    }
}
