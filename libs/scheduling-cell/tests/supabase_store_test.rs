// libs/scheduling-cell/tests/supabase_store_test.rs

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::models::AppointmentStatus;
use scheduling_cell::services::ConflictChecker;
use scheduling_cell::store::{AppointmentStore, StoreError, SupabaseScheduleStore, TimeBlockStore};
use shared_utils::test_utils::{MockSupabaseResponses, TestConfig};

use common::*;

fn store_for(server: &MockServer) -> SupabaseScheduleStore {
    SupabaseScheduleStore::new(&TestConfig::with_url(&server.uri()).to_app_config(), "user-token")
}

#[tokio::test]
async fn appointment_query_uses_lookback_and_filters_overlap_locally() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();
    let excluded = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(header("authorization", "Bearer user-token"))
        .and(query_param("owner_id", format!("eq.{}", owner)))
        .and(query_param("status", "neq.cancelled"))
        .and(query_param("scheduled_start", "gte.2024-12-22T09:00:00Z"))
        .and(query_param("scheduled_start", "lt.2024-12-23T10:00:00Z"))
        .and(query_param("id", format!("neq.{}", excluded)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            // Ends the evening before: outside the range.
            MockSupabaseResponses::appointment_row(owner, utc(2024, 12, 22, 23, 0), 30, "scheduled"),
            // Started before the range but runs into it.
            MockSupabaseResponses::appointment_row(owner, on(monday(), 8, 30), 60, "completed"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let appointments = store
        .list_non_cancelled_appointments(owner, on(monday(), 9, 0), on(monday(), 10, 0), Some(excluded))
        .await
        .unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].scheduled_start, on(monday(), 8, 30));
    assert_eq!(appointments[0].status, AppointmentStatus::Completed);
}

#[tokio::test]
async fn lookback_window_bounds_what_is_seen() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();

    // Two hour lookback from 09:00: rows starting before 07:00 are never fetched.
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("scheduled_start", "gte.2024-12-23T07:00:00Z"))
        .and(query_param("scheduled_start", "lt.2024-12-23T10:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            // At the lookback edge and still running at 09:00.
            MockSupabaseResponses::appointment_row(owner, on(monday(), 7, 0), 150, "scheduled"),
            // At the lookback edge but over by 08:30.
            MockSupabaseResponses::appointment_row(owner, on(monday(), 7, 0), 90, "scheduled"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = TestConfig::with_url(&server.uri());
    config.scheduling.appointment_lookback_hours = 2;
    let store = SupabaseScheduleStore::new(&config.to_app_config(), "user-token");

    let appointments = store
        .list_non_cancelled_appointments(owner, on(monday(), 9, 0), on(monday(), 10, 0), None)
        .await
        .unwrap();

    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].duration_minutes, 150);
}

#[tokio::test]
async fn lookback_saturates_at_earliest_time() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let appointments = store
        .list_non_cancelled_appointments(Uuid::new_v4(), DateTime::<Utc>::MIN_UTC, on(monday(), 9, 0), None)
        .await
        .unwrap();

    assert!(appointments.is_empty());
}

#[tokio::test]
async fn insert_posts_scheduled_row_and_returns_it() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "owner_id": owner,
            "scheduled_start": "2024-12-23T10:00:00Z",
            "duration_minutes": 45,
            "status": "scheduled"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            MockSupabaseResponses::appointment_row(owner, on(monday(), 10, 0), 45, "scheduled")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let apt = store
        .insert_appointment(booking(owner, on(monday(), 10, 0), 45))
        .await
        .unwrap();

    assert_eq!(apt.owner_id, owner);
    assert_eq!(apt.duration_minutes, 45);
}

#[tokio::test]
async fn exclusion_violation_maps_to_overlap_constraint() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(409).set_body_json(MockSupabaseResponses::error_response(
            "conflicting key value violates exclusion constraint \"appointments_no_overlap\"",
            "23P01",
        )))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let result = store
        .insert_appointment(booking(Uuid::new_v4(), on(monday(), 10, 0), 30))
        .await;

    assert_matches!(result, Err(StoreError::OverlapConstraint));
}

#[tokio::test]
async fn unreadable_rows_are_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/time_blocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "owner_id": Uuid::new_v4(),
            "start_time": "not a timestamp",
            "end_time": "2024-12-23T10:00:00Z",
            "title": "Broken",
            "block_type": "personal"
        }])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let result = store
        .list_blocks_overlapping(Uuid::new_v4(), on(monday(), 0, 0), on(monday(), 23, 0))
        .await;

    assert_matches!(result, Err(StoreError::Malformed(_)));
}

#[tokio::test]
async fn server_errors_are_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let result = store
        .list_non_cancelled_appointments(Uuid::new_v4(), on(monday(), 9, 0), on(monday(), 10, 0), None)
        .await;

    assert_matches!(result, Err(StoreError::Unavailable(msg)) if msg.contains("upstream down"));
}

#[tokio::test]
async fn checker_runs_against_postgrest() {
    let server = MockServer::start().await;
    let owner = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_rules"))
        .and(query_param("day_of_week", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::availability_rule_row(owner, MONDAY, t(9, 0), t(12, 0))
        ])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/time_blocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            MockSupabaseResponses::appointment_row(owner, on(monday(), 10, 0), 60, "scheduled")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let checker = ConflictChecker::new(Arc::new(store_for(&server))).with_clock(clock_before_monday());
    let verdict = checker
        .check_slot(owner, on(monday(), 10, 30), on(monday(), 11, 0), None)
        .await
        .unwrap();

    assert!(verdict.has_conflict);
    assert_eq!(verdict.message.as_deref(), Some("slot already booked"));
}
