#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use uuid::Uuid;

use scheduling_cell::models::{Appointment, AppointmentStatus, NewAppointment};
use scheduling_cell::services::{Clock, FixedClock};
use scheduling_cell::store::InMemoryScheduleStore;

pub const MONDAY: i32 = 1;
pub const TUESDAY: i32 = 2;

/// Monday 2024-12-23; the tests freeze "now" before it.
pub fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 23).unwrap()
}

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn on(date: NaiveDate, h: u32, m: u32) -> DateTime<Utc> {
    date.and_time(t(h, m)).and_utc()
}

pub fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Sunday 2024-12-22 08:00.
pub fn clock_before_monday() -> Arc<dyn Clock> {
    Arc::new(FixedClock(utc(2024, 12, 22, 8, 0)))
}

pub fn clock_at(instant: DateTime<Utc>) -> Arc<dyn Clock> {
    Arc::new(FixedClock(instant))
}

pub fn appointment(owner_id: Uuid, start: DateTime<Utc>, minutes: i32, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        owner_id,
        patient_id: Uuid::new_v4(),
        scheduled_start: start,
        duration_minutes: minutes,
        status,
        notes: None,
        created_at: None,
    }
}

pub fn booking(owner_id: Uuid, start: DateTime<Utc>, minutes: i32) -> NewAppointment {
    NewAppointment {
        owner_id,
        patient_id: Uuid::new_v4(),
        scheduled_start: start,
        duration_minutes: minutes,
        notes: Some("first visit".to_string()),
    }
}

/// Owner with a single Monday 09:00-12:00 rule.
pub async fn monday_morning_store() -> (Arc<InMemoryScheduleStore>, Uuid) {
    let store = Arc::new(InMemoryScheduleStore::new());
    let owner = Uuid::new_v4();
    store.add_weekly_rule(owner, MONDAY, t(9, 0), t(12, 0)).await;
    (store, owner)
}
