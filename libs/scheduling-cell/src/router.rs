use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{self, SchedulingState};

pub fn scheduling_routes(state: SchedulingState) -> Router {
    Router::new()
        .route("/conflicts/check", get(handlers::check_conflicts))
        .route("/owners/{owner_id}/slots", get(handlers::get_slots))
        .route("/owners/{owner_id}/next-slot", get(handlers::next_slot))
        .route("/appointments", post(handlers::book_appointment))
        .with_state(state)
}
