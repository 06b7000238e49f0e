use reqwest::Method;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{Doctor, DoctorError};

/// Read-only lookup into the `doctors` table. Doctor CRUD lives with the
/// admin tooling; the booking core only ever reads.
pub struct DoctorDirectoryService {
    supabase: SupabaseClient,
}

impl DoctorDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn get_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Doctor, DoctorError> {
        debug!("Fetching doctor: {}", doctor_id);

        let path = format!("/rest/v1/doctors?id=eq.{}", doctor_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(DoctorError::NotFound);
        }

        let doctor: Doctor = serde_json::from_value(result[0].clone())
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctor: {}", e)))?;

        Ok(doctor)
    }

    pub async fn list_doctors(
        &self,
        department: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Doctor>, DoctorError> {
        debug!("Listing doctors (department filter: {:?})", department);

        let mut path = "/rest/v1/doctors?order=full_name.asc".to_string();
        if let Some(dept) = department {
            path.push_str(&format!("&department=eq.{}", urlencoding::encode(dept)));
        }

        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            auth_token,
            None,
        ).await.map_err(|e| DoctorError::DatabaseError(e.to_string()))?;

        let doctors: Vec<Doctor> = result.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Doctor>, _>>()
            .map_err(|e| DoctorError::DatabaseError(format!("Failed to parse doctors: {}", e)))?;

        Ok(doctors)
    }
}
