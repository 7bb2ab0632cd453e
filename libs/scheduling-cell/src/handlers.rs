use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, NaiveDate, Utc};
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{Appointment, ConflictReason, ConflictResult, NewAppointment, SchedulingError, TimeSlot};
use crate::services::{BookingService, ConflictChecker, NextSlotFinder, OwnerWriteGate, SlotGenerator};
use crate::store::SupabaseScheduleStore;

#[derive(Clone)]
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub write_gate: Arc<OwnerWriteGate>,
}

impl SchedulingState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config, write_gate: Arc::new(OwnerWriteGate::new()) }
    }

    fn store_for(&self, auth: &Authorization<Bearer>) -> Arc<SupabaseScheduleStore> {
        Arc::new(SupabaseScheduleStore::new(&self.config, auth.token()))
    }
}

#[derive(Debug, Deserialize)]
pub struct ConflictCheckQuery {
    pub owner_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub exclude_appointment_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
    pub duration_minutes: Option<i64>,
    pub interval_minutes: Option<i64>,
    /// Sort and dedupe before returning.
    #[serde(default)]
    pub normalize: bool,
}

#[derive(Debug, Deserialize)]
pub struct NextSlotQuery {
    pub from: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub max_days_ahead: Option<u32>,
}

fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::InvalidTime(_) | SchedulingError::ValidationError(_) => {
            AppError::ValidationError(e.to_string())
        }
        SchedulingError::SlotUnavailable(verdict) => AppError::SlotConflict {
            reason: verdict.reason.map(|r| r.as_str()).unwrap_or("unknown").to_string(),
            message: verdict.message.unwrap_or_default(),
        },
        SchedulingError::OverlapConstraint => AppError::SlotConflict {
            reason: ConflictReason::AppointmentExists.as_str().to_string(),
            message: "slot already booked".to_string(),
        },
        SchedulingError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn check_conflicts(
    State(state): State<SchedulingState>,
    Query(query): Query<ConflictCheckQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<ConflictResult>, AppError> {
    let checker = ConflictChecker::new(state.store_for(&auth));

    let verdict = checker
        .check_slot(query.owner_id, query.start_time, query.end_time, query.exclude_appointment_id)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(verdict))
}

#[axum::debug_handler]
pub async fn get_slots(
    State(state): State<SchedulingState>,
    Path(owner_id): Path<Uuid>,
    Query(query): Query<SlotsQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Vec<TimeSlot>>, AppError> {
    let defaults = &state.config.scheduling;
    let duration = query.duration_minutes.unwrap_or(defaults.default_duration_minutes);
    let interval = query.interval_minutes.unwrap_or(defaults.default_interval_minutes);

    let generator = SlotGenerator::new(state.store_for(&auth));
    let slots = if query.normalize {
        generator.generate_slots_normalized(owner_id, query.date, duration, interval).await
    } else {
        generator.generate_slots(owner_id, query.date, duration, interval).await
    }
    .map_err(map_scheduling_error)?;

    Ok(Json(slots))
}

#[axum::debug_handler]
pub async fn next_slot(
    State(state): State<SchedulingState>,
    Path(owner_id): Path<Uuid>,
    Query(query): Query<NextSlotQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Option<TimeSlot>>, AppError> {
    let finder = NextSlotFinder::new(state.store_for(&auth), &state.config.scheduling);

    let slot = finder
        .find_next_slot(owner_id, query.from, query.duration_minutes, query.max_days_ahead)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(slot))
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<SchedulingState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let service = BookingService::new(state.store_for(&auth), Arc::clone(&state.write_gate));

    let appointment = service.book(request).await.map_err(map_scheduling_error)?;
    info!("Booked appointment {} for owner {}", appointment.id, appointment.owner_id);

    Ok((StatusCode::CREATED, Json(appointment)))
}
