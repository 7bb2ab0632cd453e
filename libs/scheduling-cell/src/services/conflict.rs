use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use availability_cell::models::day_of_week_for;

use crate::models::{ConflictResult, SchedulingError};
use crate::services::clock::{Clock, SystemClock};
use crate::services::interval::Interval;
use crate::store::ScheduleStore;

/// Decides whether a candidate interval can be booked for an owner.
///
/// Checks run in a fixed order and the first failing one wins:
/// past time, availability, time blocks, existing appointments.
pub struct ConflictChecker<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ScheduleStore> ConflictChecker<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Check `[start_time, end_time)` for `owner_id`, ignoring the appointment
    /// `exclude_appointment_id` (used when rescheduling it).
    pub async fn check_slot(
        &self,
        owner_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictResult, SchedulingError> {
        let candidate = Interval::new(start_time, end_time)?;
        self.check_interval(owner_id, candidate, exclude_appointment_id).await
    }

    pub async fn check_interval(
        &self,
        owner_id: Uuid,
        candidate: Interval,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<ConflictResult, SchedulingError> {
        debug!(
            "Checking conflicts for owner {} from {} to {}",
            owner_id, candidate.start, candidate.end
        );

        if candidate.start < self.clock.now() {
            debug!("Candidate starts in the past");
            return Ok(ConflictResult::past_time());
        }

        // A candidate must fit inside one rule; contiguous rules are not merged.
        let date = candidate.start.date_naive();
        let rules = self
            .store
            .list_active_availability(owner_id, day_of_week_for(date))
            .await?;

        if rules.is_empty() {
            debug!("No active rules for owner {} on {}", owner_id, date);
            return Ok(ConflictResult::no_rules_for_day());
        }

        if !rules.iter().any(|rule| Interval::of_rule(rule, date).contains(&candidate)) {
            debug!("Candidate is not contained by any of {} rules", rules.len());
            return Ok(ConflictResult::outside_working_hours());
        }

        let blocks = self
            .store
            .list_blocks_overlapping(owner_id, candidate.start, candidate.end)
            .await?;

        if let Some(block) = blocks.into_iter().find(|b| Interval::from(b).overlaps(&candidate)) {
            warn!("Candidate for owner {} hits block {} ({})", owner_id, block.id, block.title);
            return Ok(ConflictResult::blocked(block));
        }

        let appointments = self
            .store
            .list_non_cancelled_appointments(owner_id, candidate.start, candidate.end, exclude_appointment_id)
            .await?;

        let clash = appointments.into_iter().find(|apt| {
            apt.occupies_slot()
                && Some(apt.id) != exclude_appointment_id
                && apt.interval().overlaps(&candidate)
        });

        if let Some(apt) = clash {
            warn!("Candidate for owner {} overlaps appointment {}", owner_id, apt.id);
            return Ok(ConflictResult::appointment_exists(apt));
        }

        Ok(ConflictResult::no_conflict())
    }
}
