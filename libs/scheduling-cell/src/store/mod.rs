// libs/scheduling-cell/src/store/mod.rs
//
// Read/write seam between the scheduling core and persistence. The core only
// ever talks to these traits; tests swap in the in-memory store or mocks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use availability_cell::models::{TimeBlock, WeeklyAvailabilityRule};

use crate::models::{Appointment, NewAppointment};

pub mod memory;
pub mod supabase;

pub use memory::InMemoryScheduleStore;
pub use supabase::SupabaseScheduleStore;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed store record: {0}")]
    Malformed(String),

    /// Insert rejected because it overlaps a live appointment of the same owner.
    #[error("Appointment overlaps an existing booking")]
    OverlapConstraint,
}

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Active rules for the owner on `day_of_week` (0 = Sunday).
    async fn list_active_availability(
        &self,
        owner_id: Uuid,
        day_of_week: i32,
    ) -> Result<Vec<WeeklyAvailabilityRule>, StoreError>;
}

#[async_trait]
pub trait TimeBlockStore: Send + Sync {
    /// Blocks with `start < range_end && end > range_start`.
    async fn list_blocks_overlapping(
        &self,
        owner_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<TimeBlock>, StoreError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Non-cancelled appointments whose effective interval overlaps the range.
    async fn list_non_cancelled_appointments(
        &self,
        owner_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// Persist a booking. Must fail with [`StoreError::OverlapConstraint`]
    /// when the new interval overlaps a non-cancelled appointment of the
    /// same owner.
    async fn insert_appointment(&self, appointment: NewAppointment) -> Result<Appointment, StoreError>;
}

/// Everything the scheduling services need from persistence.
pub trait ScheduleStore: AvailabilityStore + TimeBlockStore + AppointmentStore {}

impl<T> ScheduleStore for T where T: AvailabilityStore + TimeBlockStore + AppointmentStore {}
