// libs/scheduling-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;

use availability_cell::models::TimeBlock;

use crate::services::interval::Interval;
use crate::store::StoreError;

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Appointment {
    /// Saturates at the end of representable time.
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_start
            .checked_add_signed(chrono::Duration::minutes(self.duration_minutes as i64))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Effective interval `[start, start + duration)`.
    pub fn interval(&self) -> Interval {
        Interval::from_bounds(self.scheduled_start, self.scheduled_end())
    }

    /// Whether this appointment takes part in conflict detection.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
        }
    }
}

/// Payload of a booking; also the insert shape at the store seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub owner_id: Uuid,
    pub patient_id: Uuid,
    pub scheduled_start: DateTime<Utc>,
    pub duration_minutes: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewAppointment {
    pub fn interval(&self) -> Result<Interval, SchedulingError> {
        if self.duration_minutes <= 0 {
            return Err(SchedulingError::ValidationError(
                "Appointment duration must be positive".to_string(),
            ));
        }
        Interval::starting_at(self.scheduled_start, self.duration_minutes as i64)
    }
}

// ==============================================================================
// SLOTS
// ==============================================================================

/// Generated candidate window. Not persisted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub available: bool,
}

impl TimeSlot {
    pub fn interval(&self) -> Interval {
        Interval::from_bounds(self.start, self.end)
    }
}

// ==============================================================================
// CONFLICT VERDICTS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConflictReason {
    OutsideAvailability,
    Blocked,
    AppointmentExists,
    PastTime,
}

impl ConflictReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictReason::OutsideAvailability => "outside_availability",
            ConflictReason::Blocked => "blocked",
            ConflictReason::AppointmentExists => "appointment_exists",
            ConflictReason::PastTime => "past_time",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of checking one candidate interval. A conflict is a normal
/// answer, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConflictResult {
    pub has_conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ConflictReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_appointment: Option<Appointment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflicting_block: Option<TimeBlock>,
}

impl ConflictResult {
    pub fn no_conflict() -> Self {
        Self {
            has_conflict: false,
            reason: None,
            message: None,
            conflicting_appointment: None,
            conflicting_block: None,
        }
    }

    fn conflict(reason: ConflictReason, message: String) -> Self {
        Self {
            has_conflict: true,
            reason: Some(reason),
            message: Some(message),
            conflicting_appointment: None,
            conflicting_block: None,
        }
    }

    pub fn past_time() -> Self {
        Self::conflict(ConflictReason::PastTime, "cannot book in the past".to_string())
    }

    pub fn no_rules_for_day() -> Self {
        Self::conflict(
            ConflictReason::OutsideAvailability,
            "no availability configured for this day".to_string(),
        )
    }

    pub fn outside_working_hours() -> Self {
        Self::conflict(
            ConflictReason::OutsideAvailability,
            "requested time is outside working hours".to_string(),
        )
    }

    pub fn blocked(block: TimeBlock) -> Self {
        let mut result = Self::conflict(
            ConflictReason::Blocked,
            format!("time is blocked: {}", block.title),
        );
        result.conflicting_block = Some(block);
        result
    }

    pub fn appointment_exists(appointment: Appointment) -> Self {
        let mut result = Self::conflict(
            ConflictReason::AppointmentExists,
            "slot already booked".to_string(),
        );
        result.conflicting_appointment = Some(appointment);
        result
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

/// Faults. Never used to report a conflict verdict from a check; a booking
/// that loses to a conflict is the one place a verdict travels as an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Slot unavailable ({}): {}", reason_of(.0), message_of(.0))]
    SlotUnavailable(Box<ConflictResult>),

    #[error("Appointment overlaps an existing booking for this owner")]
    OverlapConstraint,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

fn reason_of(result: &ConflictResult) -> &'static str {
    result.reason.map(|r| r.as_str()).unwrap_or("unknown")
}

fn message_of(result: &ConflictResult) -> &str {
    result.message.as_deref().unwrap_or("conflict")
}

impl From<StoreError> for SchedulingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::OverlapConstraint => SchedulingError::OverlapConstraint,
            other => SchedulingError::DatabaseError(other.to_string()),
        }
    }
}
