use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use availability_cell::models::{TimeBlock, WeeklyAvailabilityRule};
use availability_cell::services::{pg_timestamp, AvailabilityService, TimeBlockService};
use shared_config::AppConfig;
use shared_database::supabase::{return_representation, ConstraintViolation, SupabaseClient};

use crate::models::{Appointment, AppointmentStatus, NewAppointment};
use crate::services::interval::Interval;
use crate::store::{AppointmentStore, AvailabilityStore, StoreError, TimeBlockStore};

const APPOINTMENTS_PATH: &str = "/rest/v1/appointments";

/// PostgREST-backed store acting on behalf of one caller. The bearer token is
/// forwarded on every request so row-level security applies.
pub struct SupabaseScheduleStore {
    supabase: Arc<SupabaseClient>,
    availability: AvailabilityService,
    blocks: TimeBlockService,
    appointment_lookback: Duration,
    auth_token: String,
}

impl SupabaseScheduleStore {
    pub fn new(config: &AppConfig, auth_token: impl Into<String>) -> Self {
        Self::from_client(
            Arc::new(SupabaseClient::new(config)),
            config.scheduling.appointment_lookback_hours,
            auth_token,
        )
    }

    pub fn from_client(
        supabase: Arc<SupabaseClient>,
        appointment_lookback_hours: i64,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            availability: AvailabilityService::from_client(Arc::clone(&supabase)),
            blocks: TimeBlockService::from_client(Arc::clone(&supabase)),
            supabase,
            appointment_lookback: Duration::hours(appointment_lookback_hours.max(0)),
            auth_token: auth_token.into(),
        }
    }
}

/// Classifies a client failure at the store seam.
fn store_fault(err: anyhow::Error) -> StoreError {
    if err.downcast_ref::<ConstraintViolation>().is_some() {
        return StoreError::OverlapConstraint;
    }
    if err.downcast_ref::<serde_json::Error>().is_some() {
        return StoreError::Malformed(err.to_string());
    }
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl AvailabilityStore for SupabaseScheduleStore {
    async fn list_active_availability(
        &self,
        owner_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<WeeklyAvailabilityRule>, StoreError> {
        self.availability
            .list_active_rules_for_day(owner_id, day_of_week, &self.auth_token)
            .await
            .map_err(store_fault)
    }
}

#[async_trait]
impl TimeBlockStore for SupabaseScheduleStore {
    async fn list_blocks_overlapping(
        &self,
        owner_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, StoreError> {
        self.blocks
            .list_blocks_overlapping(owner_id, range_start, range_end, &self.auth_token)
            .await
            .map_err(store_fault)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseScheduleStore {
    async fn list_non_cancelled_appointments(
        &self,
        owner_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, StoreError> {
        // PostgREST can't filter on start + duration, so narrow by start
        // within a lookback window and finish the overlap test here. An
        // appointment longer than the lookback that starts before it is missed.
        let earliest_start = range_start
            .checked_sub_signed(self.appointment_lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut path = format!(
            "{}?owner_id=eq.{}&status=neq.{}&scheduled_start=gte.{}&scheduled_start=lt.{}&order=scheduled_start.asc",
            APPOINTMENTS_PATH,
            owner_id,
            AppointmentStatus::Cancelled,
            pg_timestamp(earliest_start),
            pg_timestamp(range_end),
        );
        if let Some(id) = exclude_id {
            path.push_str(&format!("&id=neq.{}", id));
        }

        debug!("Fetching appointments for owner {} in [{}, {})", owner_id, range_start, range_end);

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(&self.auth_token), None)
            .await
            .map_err(store_fault)?;

        let range = Interval::from_bounds(range_start, range_end);
        let mut appointments = Vec::with_capacity(rows.len());
        for row in rows {
            let apt: Appointment =
                serde_json::from_value(row).map_err(|e| StoreError::Malformed(e.to_string()))?;
            if apt.occupies_slot() && apt.interval().overlaps(&range) {
                appointments.push(apt);
            }
        }

        Ok(appointments)
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        if Duration::minutes(i64::from(new.duration_minutes)) > self.appointment_lookback {
            warn!(
                "Appointment of {} minutes for owner {} exceeds the {} hour lookback; later overlap checks may miss it",
                new.duration_minutes,
                new.owner_id,
                self.appointment_lookback.num_hours()
            );
        }

        let body = json!({
            "owner_id": new.owner_id,
            "patient_id": new.patient_id,
            "scheduled_start": pg_timestamp(new.scheduled_start),
            "duration_minutes": new.duration_minutes,
            "status": AppointmentStatus::Scheduled,
            "notes": new.notes,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                APPOINTMENTS_PATH,
                Some(&self.auth_token),
                Some(body),
                Some(return_representation()),
            )
            .await
            .map_err(|e| {
                let fault = store_fault(e);
                if matches!(fault, StoreError::OverlapConstraint) {
                    warn!("Exclusion constraint rejected booking for owner {}", new.owner_id);
                }
                fault
            })?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Malformed("insert returned no rows".to_string()))?;

        serde_json::from_value(row).map_err(|e| StoreError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn faults_are_classified() {
        assert!(matches!(
            store_fault(ConstraintViolation("exclusion".into()).into()),
            StoreError::OverlapConstraint
        ));

        let bad_json = serde_json::from_str::<Value>("{").unwrap_err();
        assert!(matches!(store_fault(bad_json.into()), StoreError::Malformed(_)));

        assert!(matches!(store_fault(anyhow!("API error (503)")), StoreError::Unavailable(_)));
    }
}
