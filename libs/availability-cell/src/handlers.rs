use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde::Deserialize;
use serde_json::{json, Value};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{
    AvailabilityError, CreateAvailabilityRuleRequest, UpdateAvailabilityRuleRequest,
    CreateTimeBlockRequest,
};
use crate::services::{AvailabilityService, TimeBlockService};

#[derive(Debug, Deserialize)]
pub struct BlockRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Validation failures become 400/404, anything else is a store fault.
fn map_service_error(e: anyhow::Error) -> AppError {
    match e.downcast_ref::<AvailabilityError>() {
        Some(AvailabilityError::RuleNotFound) | Some(AvailabilityError::BlockNotFound) => {
            AppError::NotFound(e.to_string())
        }
        Some(_) => AppError::ValidationError(e.to_string()),
        None => AppError::Database(e.to_string()),
    }
}

// ==============================================================================
// AVAILABILITY RULES
// ==============================================================================

#[axum::debug_handler]
pub async fn list_rules(
    State(state): State<Arc<AppConfig>>,
    Path(owner_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let rules = service.list_rules(owner_id, auth.token()).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "rules": rules,
        "total": rules.len()
    })))
}

#[axum::debug_handler]
pub async fn create_rule(
    State(state): State<Arc<AppConfig>>,
    Path(owner_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateAvailabilityRuleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let rule = service.create_rule(owner_id, request, auth.token()).await
        .map_err(map_service_error)?;

    Ok(Json(json!(rule)))
}

#[axum::debug_handler]
pub async fn update_rule(
    State(state): State<Arc<AppConfig>>,
    Path(rule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<UpdateAvailabilityRuleRequest>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let rule = service.update_rule(rule_id, request, auth.token()).await
        .map_err(map_service_error)?;

    Ok(Json(json!(rule)))
}

#[axum::debug_handler]
pub async fn delete_rule(
    State(state): State<Arc<AppConfig>>,
    Path(rule_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    service.delete_rule(rule_id, auth.token()).await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "success": true })))
}

// ==============================================================================
// TIME BLOCKS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_blocks(
    State(state): State<Arc<AppConfig>>,
    Path(owner_id): Path<Uuid>,
    Query(query): Query<BlockRangeQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = TimeBlockService::new(&state);

    let range = match (query.from, query.to) {
        (Some(from), Some(to)) if from < to => Some((from, to)),
        (Some(_), Some(_)) => {
            return Err(AppError::BadRequest("'from' must be before 'to'".to_string()));
        }
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest("Provide both 'from' and 'to' or neither".to_string()));
        }
    };

    let blocks = service.list_blocks(owner_id, range, auth.token()).await
        .map_err(map_service_error)?;

    Ok(Json(json!({
        "blocks": blocks,
        "total": blocks.len()
    })))
}

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<AppConfig>>,
    Path(owner_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreateTimeBlockRequest>,
) -> Result<Json<Value>, AppError> {
    let service = TimeBlockService::new(&state);

    let block = service.create_block(owner_id, request, auth.token()).await
        .map_err(map_service_error)?;

    Ok(Json(json!(block)))
}

#[axum::debug_handler]
pub async fn delete_block(
    State(state): State<Arc<AppConfig>>,
    Path(block_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = TimeBlockService::new(&state);

    service.delete_block(block_id, auth.token()).await
        .map_err(map_service_error)?;

    Ok(Json(json!({ "success": true })))
}
