use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use availability_cell::models::day_of_week_for;

use crate::models::{SchedulingError, TimeSlot};
use crate::services::clock::{Clock, SystemClock};
use crate::services::interval::{stride_windows, Interval};
use crate::store::ScheduleStore;

/// Enumerates fixed-length candidate slots for one owner on one date.
pub struct SlotGenerator<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S: ScheduleStore> SlotGenerator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Slots of `duration_minutes`, starting every `interval_minutes`, inside
    /// each active rule for `date`'s weekday.
    ///
    /// Rules are expanded independently in the order the store returns them,
    /// so overlapping rules produce duplicate slots and the output is not
    /// re-sorted. Use [`Self::generate_slots_normalized`] for a clean list.
    pub async fn generate_slots(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        duration_minutes: i64,
        interval_minutes: i64,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        let (duration, stride) = slot_shape(duration_minutes, interval_minutes)?;

        let rules = self
            .store
            .list_active_availability(owner_id, day_of_week_for(date))
            .await?;

        if rules.is_empty() {
            debug!("No active rules for owner {} on {}", owner_id, date);
            return Ok(Vec::new());
        }

        // One fetch per day; every slot is tested against this snapshot.
        let day = Interval::day(date)?;
        let blocks = self
            .store
            .list_blocks_overlapping(owner_id, day.start, day.end)
            .await?;
        let appointments = self
            .store
            .list_non_cancelled_appointments(owner_id, day.start, day.end, None)
            .await?;

        let busy: Vec<Interval> = blocks
            .iter()
            .map(Interval::from)
            .chain(appointments.iter().filter(|a| a.occupies_slot()).map(|a| a.interval()))
            .collect();

        let now = self.clock.now();
        let slots: Vec<TimeSlot> = rules
            .iter()
            .flat_map(|rule| stride_windows(Interval::of_rule(rule, date), duration, stride))
            .map(|window| TimeSlot {
                start: window.start,
                end: window.end,
                available: window.start >= now && !busy.iter().any(|b| b.overlaps(&window)),
            })
            .collect();

        debug!(
            "Generated {} slots for owner {} on {} from {} rules",
            slots.len(),
            owner_id,
            date,
            rules.len()
        );

        Ok(slots)
    }

    /// Same slots, stably sorted by start with exact duplicates removed.
    pub async fn generate_slots_normalized(
        &self,
        owner_id: Uuid,
        date: NaiveDate,
        duration_minutes: i64,
        interval_minutes: i64,
    ) -> Result<Vec<TimeSlot>, SchedulingError> {
        let slots = self
            .generate_slots(owner_id, date, duration_minutes, interval_minutes)
            .await?;
        Ok(normalize_slots(slots))
    }
}

fn slot_shape(duration_minutes: i64, interval_minutes: i64) -> Result<(Duration, Duration), SchedulingError> {
    if duration_minutes <= 0 {
        return Err(SchedulingError::ValidationError(
            "Slot duration must be positive".to_string(),
        ));
    }
    if interval_minutes <= 0 {
        return Err(SchedulingError::ValidationError(
            "Slot interval must be positive".to_string(),
        ));
    }
    let out_of_range = || SchedulingError::ValidationError("Slot length out of range".to_string());
    Ok((
        Duration::try_minutes(duration_minutes).ok_or_else(out_of_range)?,
        Duration::try_minutes(interval_minutes).ok_or_else(out_of_range)?,
    ))
}

/// Stable sort by start, keeping the first of any exactly equal slots.
pub fn normalize_slots(mut slots: Vec<TimeSlot>) -> Vec<TimeSlot> {
    slots.sort_by_key(|s| s.start);
    let mut seen = HashSet::with_capacity(slots.len());
    slots.retain(|s| seen.insert(*s));
    slots
}
