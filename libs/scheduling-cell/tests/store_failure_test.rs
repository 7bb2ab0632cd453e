// libs/scheduling-cell/tests/store_failure_test.rs

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use mockall::predicate::*;
use uuid::Uuid;

use availability_cell::models::{TimeBlock, WeeklyAvailabilityRule};
use scheduling_cell::models::{Appointment, NewAppointment, SchedulingError};
use scheduling_cell::services::{BookingService, ConflictChecker, NextSlotFinder, OwnerWriteGate, SlotGenerator};
use scheduling_cell::store::{AppointmentStore, AvailabilityStore, StoreError, TimeBlockStore};
use shared_config::SchedulingConfig;

use common::*;

mock! {
    pub Store {}

    #[async_trait]
    impl AvailabilityStore for Store {
        async fn list_active_availability(
            &self,
            owner_id: Uuid,
            day_of_week: i32,
        ) -> Result<Vec<WeeklyAvailabilityRule>, StoreError>;
    }

    #[async_trait]
    impl TimeBlockStore for Store {
        async fn list_blocks_overlapping(
            &self,
            owner_id: Uuid,
            range_start: DateTime<Utc>,
            range_end: DateTime<Utc>,
        ) -> Result<Vec<TimeBlock>, StoreError>;
    }

    #[async_trait]
    impl AppointmentStore for Store {
        async fn list_non_cancelled_appointments(
            &self,
            owner_id: Uuid,
            range_start: DateTime<Utc>,
            range_end: DateTime<Utc>,
            exclude_id: Option<Uuid>,
        ) -> Result<Vec<Appointment>, StoreError>;

        async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;
    }
}

fn monday_rule(owner_id: Uuid) -> WeeklyAvailabilityRule {
    WeeklyAvailabilityRule {
        id: Uuid::new_v4(),
        owner_id,
        day_of_week: MONDAY,
        start_time: t(9, 0),
        end_time: t(12, 0),
        is_active: true,
        created_at: None,
        updated_at: None,
    }
}

#[tokio::test]
async fn rule_lookup_failure_fails_the_check() {
    let owner = Uuid::new_v4();
    let mut store = MockStore::new();
    store
        .expect_list_active_availability()
        .with(eq(owner), eq(MONDAY))
        .times(1)
        .returning(|_, _| Err(StoreError::Unavailable("connection reset".to_string())));
    store.expect_list_blocks_overlapping().never();
    store.expect_list_non_cancelled_appointments().never();

    let checker = ConflictChecker::new(Arc::new(store)).with_clock(clock_before_monday());
    let result = checker
        .check_slot(owner, on(monday(), 9, 0), on(monday(), 10, 0), None)
        .await;

    assert_matches!(result, Err(SchedulingError::DatabaseError(msg)) if msg.contains("connection reset"));
}

#[tokio::test]
async fn past_candidate_never_reaches_the_store() {
    let mut store = MockStore::new();
    store.expect_list_active_availability().never();
    store.expect_list_blocks_overlapping().never();
    store.expect_list_non_cancelled_appointments().never();

    let checker = ConflictChecker::new(Arc::new(store)).with_clock(clock_at(on(monday(), 12, 0)));
    let verdict = checker
        .check_slot(Uuid::new_v4(), on(monday(), 9, 0), on(monday(), 10, 0), None)
        .await
        .unwrap();

    assert!(verdict.has_conflict);
}

#[tokio::test]
async fn exclusion_id_is_forwarded_to_the_store() {
    let owner = Uuid::new_v4();
    let excluded = Uuid::new_v4();
    let mut store = MockStore::new();
    store
        .expect_list_active_availability()
        .returning(move |_, _| Ok(vec![monday_rule(owner)]));
    store.expect_list_blocks_overlapping().returning(|_, _, _| Ok(vec![]));
    store
        .expect_list_non_cancelled_appointments()
        .withf(move |_, _, _, exclude| *exclude == Some(excluded))
        .times(1)
        .returning(|_, _, _, _| Ok(vec![]));

    let checker = ConflictChecker::new(Arc::new(store)).with_clock(clock_before_monday());
    let verdict = checker
        .check_slot(owner, on(monday(), 9, 0), on(monday(), 10, 0), Some(excluded))
        .await
        .unwrap();

    assert!(!verdict.has_conflict);
}

#[tokio::test]
async fn generator_fails_whole_call_on_malformed_blocks() {
    let owner = Uuid::new_v4();
    let mut store = MockStore::new();
    store
        .expect_list_active_availability()
        .returning(move |_, _| Ok(vec![monday_rule(owner)]));
    store
        .expect_list_blocks_overlapping()
        .withf(|_, start, end| *start == on(monday(), 0, 0) && *end == on(monday().succ_opt().unwrap(), 0, 0))
        .returning(|_, _, _| Err(StoreError::Malformed("block_type: unknown variant".to_string())));
    store.expect_list_non_cancelled_appointments().never();

    let generator = SlotGenerator::new(Arc::new(store)).with_clock(clock_before_monday());
    let result = generator.generate_slots(owner, monday(), 30, 30).await;

    assert_matches!(result, Err(SchedulingError::DatabaseError(_)));
}

#[tokio::test]
async fn next_slot_search_stops_at_first_failure() {
    let mut store = MockStore::new();
    store
        .expect_list_active_availability()
        .times(1)
        .returning(|_, _| Err(StoreError::Unavailable("timeout".to_string())));

    let finder = NextSlotFinder::new(Arc::new(store), &SchedulingConfig::default())
        .with_clock(clock_before_monday());
    let result = finder
        .find_next_slot(Uuid::new_v4(), Some(on(monday(), 0, 0)), None, Some(30))
        .await;

    assert_matches!(result, Err(SchedulingError::DatabaseError(_)));
}

#[tokio::test]
async fn write_time_rejection_surfaces_as_overlap_constraint() {
    let owner = Uuid::new_v4();
    let mut store = MockStore::new();
    store
        .expect_list_active_availability()
        .returning(move |_, _| Ok(vec![monday_rule(owner)]));
    store.expect_list_blocks_overlapping().returning(|_, _, _| Ok(vec![]));
    store.expect_list_non_cancelled_appointments().returning(|_, _, _, _| Ok(vec![]));
    store
        .expect_insert_appointment()
        .times(1)
        .returning(|_| Err(StoreError::OverlapConstraint));

    let service = BookingService::new(Arc::new(store), Arc::new(OwnerWriteGate::new()))
        .with_clock(clock_before_monday());
    let result = service.book(booking(owner, on(monday(), 9, 0), 30)).await;

    assert_matches!(result, Err(SchedulingError::OverlapConstraint));
}

#[tokio::test]
async fn conflicting_booking_is_never_inserted() {
    let owner = Uuid::new_v4();
    let mut store = MockStore::new();
    store
        .expect_list_active_availability()
        .returning(move |_, _| Ok(vec![monday_rule(owner)]));
    store.expect_list_blocks_overlapping().returning(|_, _, _| Ok(vec![]));
    store.expect_list_non_cancelled_appointments().returning(move |_, _, _, _| {
        Ok(vec![appointment(
            owner,
            on(monday(), 9, 0),
            60,
            scheduling_cell::models::AppointmentStatus::Scheduled,
        )])
    });
    store.expect_insert_appointment().never();

    let service = BookingService::new(Arc::new(store), Arc::new(OwnerWriteGate::new()))
        .with_clock(clock_before_monday());
    let result = service.book(booking(owner, on(monday(), 9, 30), 30)).await;

    assert_matches!(result, Err(SchedulingError::SlotUnavailable(_)));
}
