use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use availability_cell::models::{BlockType, TimeBlock, WeeklyAvailabilityRule};

use crate::models::{Appointment, AppointmentStatus, NewAppointment};
use crate::services::interval::Interval;
use crate::store::{AppointmentStore, AvailabilityStore, StoreError, TimeBlockStore};

#[derive(Default)]
struct OwnerCalendar {
    rules: Vec<WeeklyAvailabilityRule>,
    blocks: Vec<TimeBlock>,
    appointments: Vec<Appointment>,
}

/// Process-local store. Rules come back in insertion order; the overlap
/// check and the insert in `insert_appointment` run under one write lock.
#[derive(Clone, Default)]
pub struct InMemoryScheduleStore {
    calendars: Arc<RwLock<HashMap<Uuid, OwnerCalendar>>>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_rule(&self, rule: WeeklyAvailabilityRule) {
        let mut calendars = self.calendars.write().await;
        calendars.entry(rule.owner_id).or_default().rules.push(rule);
    }

    /// Convenience for an active rule.
    pub async fn add_weekly_rule(
        &self,
        owner_id: Uuid,
        day_of_week: i32,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> WeeklyAvailabilityRule {
        let rule = WeeklyAvailabilityRule {
            id: Uuid::new_v4(),
            owner_id,
            day_of_week,
            start_time,
            end_time,
            is_active: true,
            created_at: Some(Utc::now()),
            updated_at: None,
        };
        self.add_rule(rule.clone()).await;
        rule
    }

    pub async fn add_block(
        &self,
        owner_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        title: &str,
        block_type: BlockType,
    ) -> TimeBlock {
        let block = TimeBlock {
            id: Uuid::new_v4(),
            owner_id,
            start_time,
            end_time,
            title: title.to_string(),
            block_type,
            created_at: Some(Utc::now()),
        };
        let mut calendars = self.calendars.write().await;
        calendars.entry(owner_id).or_default().blocks.push(block.clone());
        block
    }

    /// Seeds an appointment as-is, skipping the overlap constraint. Useful
    /// for loading legacy data or staging a conflicting calendar.
    pub async fn add_appointment(&self, appointment: Appointment) {
        let mut calendars = self.calendars.write().await;
        calendars
            .entry(appointment.owner_id)
            .or_default()
            .appointments
            .push(appointment);
    }

    pub async fn cancel_appointment(&self, appointment_id: Uuid) -> bool {
        let mut calendars = self.calendars.write().await;
        for calendar in calendars.values_mut() {
            if let Some(apt) = calendar.appointments.iter_mut().find(|a| a.id == appointment_id) {
                apt.status = AppointmentStatus::Cancelled;
                return true;
            }
        }
        false
    }

    /// Every appointment of the owner, cancelled ones included.
    pub async fn appointments(&self, owner_id: Uuid) -> Vec<Appointment> {
        let calendars = self.calendars.read().await;
        calendars
            .get(&owner_id)
            .map(|c| c.appointments.clone())
            .unwrap_or_default()
    }
}

fn live_overlapping<'a>(
    appointments: &'a [Appointment],
    range: Interval,
    exclude_id: Option<Uuid>,
) -> impl Iterator<Item = &'a Appointment> + 'a {
    appointments.iter().filter(move |apt| {
        apt.occupies_slot() && Some(apt.id) != exclude_id && apt.interval().overlaps(&range)
    })
}

#[async_trait]
impl AvailabilityStore for InMemoryScheduleStore {
    async fn list_active_availability(
        &self,
        owner_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<WeeklyAvailabilityRule>, StoreError> {
        let calendars = self.calendars.read().await;
        Ok(calendars
            .get(&owner_id)
            .map(|c| {
                c.rules
                    .iter()
                    .filter(|r| r.is_active && r.day_of_week == day_of_week)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl TimeBlockStore for InMemoryScheduleStore {
    async fn list_blocks_overlapping(
        &self,
        owner_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, StoreError> {
        let range = Interval::from_bounds(range_start, range_end);
        let calendars = self.calendars.read().await;
        Ok(calendars
            .get(&owner_id)
            .map(|c| {
                c.blocks
                    .iter()
                    .filter(|b| Interval::from(*b).overlaps(&range))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl AppointmentStore for InMemoryScheduleStore {
    async fn list_non_cancelled_appointments(
        &self,
        owner_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, StoreError> {
        let range = Interval::from_bounds(range_start, range_end);
        let calendars = self.calendars.read().await;
        Ok(calendars
            .get(&owner_id)
            .map(|c| live_overlapping(&c.appointments, range, exclude_id).cloned().collect())
            .unwrap_or_default())
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<Appointment, StoreError> {
        let range = new
            .interval()
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let mut calendars = self.calendars.write().await;
        let calendar = calendars.entry(new.owner_id).or_default();

        if live_overlapping(&calendar.appointments, range, None).next().is_some() {
            debug!("Rejecting overlapping insert for owner {}", new.owner_id);
            return Err(StoreError::OverlapConstraint);
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            owner_id: new.owner_id,
            patient_id: new.patient_id,
            scheduled_start: new.scheduled_start,
            duration_minutes: new.duration_minutes,
            status: AppointmentStatus::Scheduled,
            notes: new.notes,
            created_at: Some(Utc::now()),
        };
        calendar.appointments.push(appointment.clone());
        Ok(appointment)
    }
}
