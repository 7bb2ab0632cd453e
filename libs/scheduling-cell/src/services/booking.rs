// libs/scheduling-cell/src/services/booking.rs
//
// Check-then-insert for new appointments. Two layers keep an owner from being
// double-booked: a per-owner async mutex serializes bookings inside this
// process, and the store's exclusion constraint rejects whatever slips past
// it (another process, a direct insert).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::models::{Appointment, NewAppointment, SchedulingError};
use crate::services::clock::Clock;
use crate::services::conflict::ConflictChecker;
use crate::store::ScheduleStore;

/// One async mutex per owner id.
#[derive(Default)]
pub struct OwnerWriteGate {
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl OwnerWriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other booking for `owner_id` holds the gate.
    pub async fn acquire(&self, owner_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Drop entries nobody is holding or waiting on.
            locks.retain(|id, lock| *id == owner_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(owner_id).or_default())
        };
        lock.lock_owned().await
    }

    pub async fn tracked_owners(&self) -> usize {
        self.locks.lock().await.len()
    }
}

pub struct BookingService<S> {
    store: Arc<S>,
    checker: ConflictChecker<S>,
    gate: Arc<OwnerWriteGate>,
}

impl<S: ScheduleStore> BookingService<S> {
    pub fn new(store: Arc<S>, gate: Arc<OwnerWriteGate>) -> Self {
        Self {
            checker: ConflictChecker::new(Arc::clone(&store)),
            store,
            gate,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.checker = self.checker.with_clock(clock);
        self
    }

    /// Book `request` if its interval is free.
    ///
    /// A conflict found under the gate comes back as
    /// [`SchedulingError::SlotUnavailable`]; a store-level rejection as
    /// [`SchedulingError::OverlapConstraint`].
    #[instrument(skip(self, request), fields(owner_id = %request.owner_id, start = %request.scheduled_start))]
    pub async fn book(&self, request: NewAppointment) -> Result<Appointment, SchedulingError> {
        let candidate = request.interval()?;

        let _guard = self.gate.acquire(request.owner_id).await;
        debug!("Write gate acquired");

        let verdict = self.checker.check_interval(request.owner_id, candidate, None).await?;
        if verdict.has_conflict {
            warn!("Booking rejected: {}", verdict.message.as_deref().unwrap_or("conflict"));
            return Err(SchedulingError::SlotUnavailable(Box::new(verdict)));
        }

        let appointment = self.store.insert_appointment(request).await?;
        info!("Appointment {} booked", appointment.id);

        Ok(appointment)
    }
}
