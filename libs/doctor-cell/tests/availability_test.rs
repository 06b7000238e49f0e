use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::{MockServer, Mock, ResponseTemplate};
use wiremock::matchers::{method, path, query_param, headers};

use doctor_cell::models::{AvailabilityEntry, SetAvailabilityRequest, SlotKey};
use doctor_cell::services::availability::AvailabilityService;
use doctor_cell::services::directory::DoctorDirectoryService;
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

fn service(mock_server: &MockServer) -> AvailabilityService {
    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    AvailabilityService::new(&config)
}

#[tokio::test]
async fn set_availability_upserts_with_merge_duplicates() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("on_conflict", "doctor_id,date,slot"))
        .and(headers("Prefer", vec!["resolution=merge-duplicates", "return=representation"]))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &doctor_id.to_string(), &today.to_string(), "morning", true),
            MockSupabaseResponses::availability_response(
                &doctor_id.to_string(), &today.to_string(), "evening", false),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let request = SetAvailabilityRequest {
        entries: vec![
            AvailabilityEntry { date: today, slot: SlotKey::Morning, is_open: true },
            AvailabilityEntry { date: today, slot: SlotKey::Evening, is_open: false },
        ],
    };

    let updated = service(&mock_server)
        .set_availability(doctor_id, request, "test-token")
        .await
        .unwrap();

    assert_eq!(updated, 2);
}

#[tokio::test]
async fn resubmitting_identical_availability_keeps_one_row_per_slot() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    // Both submissions must go through the upsert path; the representation
    // coming back holds one row for the (date, slot), not an accumulation
    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("on_conflict", "doctor_id,date,slot"))
        .and(headers("Prefer", vec!["resolution=merge-duplicates", "return=representation"]))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &doctor_id.to_string(), &today.to_string(), "morning", true),
        ])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let request = SetAvailabilityRequest {
        entries: vec![
            AvailabilityEntry { date: today, slot: SlotKey::Morning, is_open: true },
        ],
    };

    let service = service(&mock_server);

    let first = service.set_availability(doctor_id, request.clone(), "test-token").await.unwrap();
    let second = service.set_availability(doctor_id, request, "test-token").await.unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 1);
}

#[tokio::test]
async fn set_availability_rejects_empty_submission() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    let result = service(&mock_server)
        .set_availability(doctor_id, SetAvailabilityRequest { entries: vec![] }, "test-token")
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn set_availability_rejects_dates_outside_window() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let beyond_window = Utc::now().date_naive() + Duration::days(10);

    // No write may reach the store for an invalid submission
    Mock::given(method("POST"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let request = SetAvailabilityRequest {
        entries: vec![
            AvailabilityEntry { date: beyond_window, slot: SlotKey::Morning, is_open: true },
        ],
    };

    let result = service(&mock_server)
        .set_availability(doctor_id, request, "test-token")
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn absent_availability_rows_read_back_closed() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let open = service(&mock_server)
        .is_slot_open(doctor_id, today, SlotKey::Morning, None)
        .await
        .unwrap();

    assert!(!open);
}

#[tokio::test]
async fn stored_open_flag_reads_back_open() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("date", format!("eq.{}", today)))
        .and(query_param("slot", "eq.morning"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &doctor_id.to_string(), &today.to_string(), "morning", true),
        ])))
        .mount(&mock_server)
        .await;

    let open = service(&mock_server)
        .is_slot_open(doctor_id, today, SlotKey::Morning, None)
        .await
        .unwrap();

    assert!(open);
}

#[tokio::test]
async fn closed_flag_reads_back_closed() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &doctor_id.to_string(), &today.to_string(), "morning", false),
        ])))
        .mount(&mock_server)
        .await;

    let open = service(&mock_server)
        .is_slot_open(doctor_id, today, SlotKey::Morning, None)
        .await
        .unwrap();

    assert!(!open);
}

#[tokio::test]
async fn week_schedule_fills_closed_defaults_for_missing_rows() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    // Only one of the 14 grid cells has a stored row
    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &doctor_id.to_string(), &today.to_string(), "evening", true),
        ])))
        .mount(&mock_server)
        .await;

    let days = service(&mock_server)
        .week_schedule(doctor_id, today, "test-token")
        .await
        .unwrap();

    assert_eq!(days.len(), 7);
    for day in &days {
        assert_eq!(day.slots.len(), 2);
    }

    let open_cells: Vec<_> = days.iter()
        .flat_map(|day| day.slots.iter().map(move |s| (day.date, s.slot, s.is_open)))
        .filter(|(_, _, is_open)| *is_open)
        .collect();
    assert_eq!(open_cells, vec![(today, SlotKey::Evening, true)]);
}

#[tokio::test]
async fn booking_schedule_marks_open_and_booked_cells() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_response(
                &doctor_id.to_string(), &today.to_string(), "morning", true),
            MockSupabaseResponses::availability_response(
                &doctor_id.to_string(), &today.to_string(), "evening", true),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("status", "eq.confirmed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "date": today.to_string(), "slot": "morning" }
        ])))
        .mount(&mock_server)
        .await;

    let days = service(&mock_server)
        .booking_schedule(doctor_id, today, None)
        .await
        .unwrap();

    assert_eq!(days.len(), 7);

    let first_day = &days[0];
    let morning = &first_day.slots[0];
    let evening = &first_day.slots[1];

    assert!(morning.open);
    assert!(morning.already_booked);
    assert!(evening.open);
    assert!(!evening.already_booked);

    // Remaining days have no rows at all: closed, not booked
    for day in &days[1..] {
        for slot in &day.slots {
            assert!(!slot.open);
            assert!(!slot.already_booked);
        }
    }
}

#[tokio::test]
async fn directory_returns_not_found_for_unknown_doctor() {
    let mock_server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let config = TestConfig::with_mock_server(&mock_server.uri()).to_app_config();
    let directory = DoctorDirectoryService::new(&config);

    let result = directory.get_doctor(doctor_id, None).await;
    assert!(matches!(result, Err(doctor_cell::models::DoctorError::NotFound)));
}
