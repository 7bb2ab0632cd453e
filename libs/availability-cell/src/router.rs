use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, put},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn availability_routes(state: Arc<AppConfig>) -> Router {
    // Row-level security in the store decides who may touch which owner's
    // calendar; handlers only forward the bearer token.
    Router::new()
        .route("/owners/{owner_id}/rules", get(handlers::list_rules).post(handlers::create_rule))
        .route("/rules/{rule_id}", put(handlers::update_rule).delete(handlers::delete_rule))
        .route("/owners/{owner_id}/blocks", get(handlers::list_blocks).post(handlers::create_block))
        .route("/blocks/{block_id}", delete(handlers::delete_block))
        .with_state(state)
}
