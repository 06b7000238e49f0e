use std::collections::{HashMap, HashSet};

use chrono::{Datelike, NaiveDate};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::calendar::{self, SLOT_DEFINITIONS};
use crate::models::{
    AvailabilityRecord, BookingDaySchedule, BookingSlotState, DaySchedule,
    DoctorError, SetAvailabilityRequest, SlotKey, SlotState,
};

/// Minimal projection of an appointment row; only the slot coordinates are
/// needed to mark grid cells as booked.
#[derive(Debug, Deserialize)]
struct BookedSlotRow {
    date: NaiveDate,
    slot: SlotKey,
}

/// Persisted per-doctor, per-date, per-slot open/closed flags. Absence of a
/// row always reads back as closed.
pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Upsert the doctor's availability flags. Resubmitting the same
    /// (date, slot) replaces the stored value; the UNIQUE
    /// (doctor_id, date, slot) constraint plus the merge-duplicates
    /// preference make this last-write-wins with no duplicate rows.
    pub async fn set_availability(
        &self,
        doctor_id: Uuid,
        request: SetAvailabilityRequest,
        auth_token: &str,
    ) -> Result<usize, DoctorError> {
        debug!("Upserting {} availability entries for doctor {}", request.entries.len(), doctor_id);

        if request.entries.is_empty() {
            return Err(DoctorError::ValidationError("No availability entries provided".to_string()));
        }

        let today = chrono::Utc::now().date_naive();
        for entry in &request.entries {
            if !calendar::is_within_booking_window(today, entry.date) {
                return Err(DoctorError::ValidationError(format!(
                    "Date {} is outside the {}-day booking window",
                    entry.date,
                    calendar::BOOKING_HORIZON_DAYS
                )));
            }
        }

        let rows: Vec<Value> = request.entries.iter()
            .map(|entry| json!({
                "doctor_id": doctor_id,
                "date": entry.date,
                "slot": entry.slot,
                "is_open": entry.is_open,
            }))
            .collect();

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("resolution=merge-duplicates,return=representation"));

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/doctor_availability?on_conflict=doctor_id,date,slot",
            Some(auth_token),
            Some(Value::Array(rows)),
            Some(headers),
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        debug!("Availability upsert stored {} rows for doctor {}", result.len(), doctor_id);
        Ok(result.len())
    }

    /// Stored open/closed flags for the date range, keyed by (date, slot).
    /// Pairs with no row are simply absent; callers treat absent as closed.
    pub async fn get_availability(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<HashMap<(NaiveDate, SlotKey), bool>, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&date=gte.{}&date=lte.{}",
            doctor_id, from, to
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let records: Vec<AvailabilityRecord> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityRecord>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse availability: {}", e)))?;

        Ok(records.into_iter()
            .map(|record| ((record.date, record.slot), record.is_open))
            .collect())
    }

    /// Whether the doctor has opened this exact (date, slot). Missing rows
    /// are closed, never open.
    pub async fn is_slot_open(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        slot: SlotKey,
        auth_token: Option<&str>,
    ) -> Result<bool, DoctorError> {
        let path = format!(
            "/rest/v1/doctor_availability?doctor_id=eq.{}&date=eq.{}&slot=eq.{}",
            doctor_id, date, slot
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let Some(row) = result.first() else {
            return Ok(false);
        };

        let record: AvailabilityRecord = serde_json::from_value(row.clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse availability: {}", e)))?;

        Ok(record.is_open)
    }

    /// The doctor's own 7-day grid, with closed defaults filled in for every
    /// (date, slot) pair that has no stored row.
    pub async fn week_schedule(
        &self,
        doctor_id: Uuid,
        start: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<DaySchedule>, DoctorError> {
        let window = calendar::booking_window(start);
        let stored = self.get_availability(
            doctor_id,
            window[0],
            window[window.len() - 1],
            Some(auth_token),
        ).await?;

        let days = window.into_iter()
            .map(|date| DaySchedule {
                date,
                weekday: date.weekday().to_string(),
                slots: SLOT_DEFINITIONS.iter()
                    .map(|def| SlotState {
                        slot: def.key,
                        label: def.label.to_string(),
                        is_open: stored.get(&(date, def.key)).copied().unwrap_or(false),
                    })
                    .collect(),
            })
            .collect();

        Ok(days)
    }

    /// Patient-facing 7-day grid: open flags cross-referenced with confirmed
    /// appointments, so the UI can distinguish bookable, taken, and closed
    /// cells.
    pub async fn booking_schedule(
        &self,
        doctor_id: Uuid,
        start: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<BookingDaySchedule>, DoctorError> {
        let window = calendar::booking_window(start);
        let from = window[0];
        let to = window[window.len() - 1];

        let stored = self.get_availability(doctor_id, from, to, auth_token).await?;
        let booked = self.get_booked_slots(doctor_id, from, to, auth_token).await?;

        let days = window.into_iter()
            .map(|date| BookingDaySchedule {
                date,
                weekday: date.weekday().to_string(),
                slots: SLOT_DEFINITIONS.iter()
                    .map(|def| BookingSlotState {
                        slot: def.key,
                        label: def.label.to_string(),
                        open: stored.get(&(date, def.key)).copied().unwrap_or(false),
                        already_booked: booked.contains(&(date, def.key)),
                    })
                    .collect(),
            })
            .collect();

        Ok(days)
    }

    async fn get_booked_slots(
        &self,
        doctor_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<HashSet<(NaiveDate, SlotKey)>, DoctorError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=gte.{}&date=lte.{}&status=eq.confirmed&select=date,slot",
            doctor_id, from, to
        );

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let rows: Vec<BookedSlotRow> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<BookedSlotRow>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(rows.into_iter().map(|row| (row.date, row.slot)).collect())
    }
}
