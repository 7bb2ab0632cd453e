pub mod availability;
pub mod time_block;

pub use availability::AvailabilityService;
pub use time_block::{TimeBlockService, pg_timestamp};
