pub mod booking;
pub mod clock;
pub mod conflict;
pub mod interval;
pub mod next_slot;
pub mod slots;

pub use booking::{BookingService, OwnerWriteGate};
pub use clock::{Clock, FixedClock, SystemClock};
pub use conflict::ConflictChecker;
pub use interval::Interval;
pub use next_slot::NextSlotFinder;
pub use slots::{normalize_slots, SlotGenerator};
