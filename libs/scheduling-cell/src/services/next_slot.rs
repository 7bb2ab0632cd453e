use std::sync::Arc;

use chrono::{DateTime, Days, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::SchedulingConfig;

use crate::models::{SchedulingError, TimeSlot};
use crate::services::clock::{Clock, SystemClock};
use crate::services::slots::SlotGenerator;
use crate::store::ScheduleStore;

/// Bounded day-by-day search for the earliest bookable slot.
pub struct NextSlotFinder<S> {
    generator: SlotGenerator<S>,
    clock: Arc<dyn Clock>,
    defaults: SchedulingConfig,
}

impl<S: ScheduleStore> NextSlotFinder<S> {
    pub fn new(store: Arc<S>, defaults: &SchedulingConfig) -> Self {
        Self {
            generator: SlotGenerator::new(store),
            clock: Arc::new(SystemClock),
            defaults: defaults.clone(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.generator = self.generator.with_clock(Arc::clone(&clock));
        self.clock = clock;
        self
    }

    /// First available slot starting at or after `from` (default: now),
    /// looking at no more than `max_days_ahead` calendar days beginning with
    /// `from`'s own date, capped at the configured `max_search_days`. `Ok(None)` when nothing is free in that horizon.
    pub async fn find_next_slot(
        &self,
        owner_id: Uuid,
        from: Option<DateTime<Utc>>,
        duration_minutes: Option<i64>,
        max_days_ahead: Option<u32>,
    ) -> Result<Option<TimeSlot>, SchedulingError> {
        let from = from.unwrap_or_else(|| self.clock.now());
        let duration = duration_minutes.unwrap_or(self.defaults.default_duration_minutes);
        let requested = max_days_ahead.unwrap_or(self.defaults.max_days_ahead);
        let max_days = requested.min(self.defaults.max_search_days);
        if max_days < requested {
            debug!("Clamped search horizon from {} to {} days", requested, max_days);
        }

        debug!(
            "Searching next slot for owner {} from {} ({} min, {} days)",
            owner_id, from, duration, max_days
        );

        let first_day = from.date_naive();
        for offset in 0..max_days {
            let Some(date) = first_day.checked_add_days(Days::new(offset as u64)) else {
                break;
            };

            let slots = self
                .generator
                .generate_slots(owner_id, date, duration, self.defaults.default_interval_minutes)
                .await?;

            // Raw output may be unsorted when rules overlap.
            let earliest = slots
                .into_iter()
                .filter(|slot| slot.available && slot.start >= from)
                .min_by_key(|slot| slot.start);

            if let Some(slot) = earliest {
                info!("Next slot for owner {} found at {}", owner_id, slot.start);
                return Ok(Some(slot));
            }
        }

        debug!("No slot for owner {} within {} days", owner_id, max_days);
        Ok(None)
    }
}
