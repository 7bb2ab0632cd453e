use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{TimeBlock, CreateTimeBlockRequest, AvailabilityError};
use crate::services::availability::first_row;

const BLOCKS_PATH: &str = "/rest/v1/time_blocks";

pub struct TimeBlockService {
    supabase: Arc<SupabaseClient>,
}

impl TimeBlockService {
    pub fn new(config: &AppConfig) -> Self {
        Self::from_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn from_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Block out an interval (vacation, holiday, personal time).
    pub async fn create_block(
        &self,
        owner_id: Uuid,
        request: CreateTimeBlockRequest,
        auth_token: &str,
    ) -> Result<TimeBlock> {
        debug!("Creating {} block for owner {}", request.block_type, owner_id);

        if request.start_time >= request.end_time {
            return Err(AvailabilityError::InvalidTimeRange.into());
        }
        if request.title.trim().is_empty() {
            return Err(AvailabilityError::EmptyTitle.into());
        }

        let block_data = json!({
            "owner_id": owner_id,
            "start_time": pg_timestamp(request.start_time),
            "end_time": pg_timestamp(request.end_time),
            "title": request.title.trim(),
            "block_type": request.block_type,
            "created_at": Utc::now().to_rfc3339()
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            BLOCKS_PATH,
            Some(auth_token),
            Some(block_data),
            Some(return_representation()),
        ).await?;

        let block = first_row::<TimeBlock>(result)
            .ok_or_else(|| anyhow!("Failed to create time block"))??;
        debug!("Time block created with ID: {}", block.id);

        Ok(block)
    }

    /// Blocks of an owner, optionally restricted to those overlapping a range.
    pub async fn list_blocks(
        &self,
        owner_id: Uuid,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
        auth_token: &str,
    ) -> Result<Vec<TimeBlock>> {
        match range {
            Some((from, to)) => self.list_blocks_overlapping(owner_id, from, to, auth_token).await,
            None => {
                let path = format!("{}?owner_id=eq.{}&order=start_time.asc", BLOCKS_PATH, owner_id);
                self.fetch_blocks(&path, auth_token).await
            }
        }
    }

    /// Blocks whose `[start, end)` overlaps `[range_start, range_end)`.
    /// Touching endpoints do not overlap.
    pub async fn list_blocks_overlapping(
        &self,
        owner_id: Uuid,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
        auth_token: &str,
    ) -> Result<Vec<TimeBlock>> {
        debug!("Fetching blocks for owner {} between {} and {}", owner_id, range_start, range_end);

        let path = format!(
            "{}?owner_id=eq.{}&start_time=lt.{}&end_time=gt.{}&order=start_time.asc",
            BLOCKS_PATH,
            owner_id,
            pg_timestamp(range_end),
            pg_timestamp(range_start),
        );
        self.fetch_blocks(&path, auth_token).await
    }

    pub async fn delete_block(
        &self,
        block_id: Uuid,
        auth_token: &str,
    ) -> Result<()> {
        debug!("Deleting time block: {}", block_id);

        let path = format!("{}?id=eq.{}", BLOCKS_PATH, block_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token)).await
    }

    async fn fetch_blocks(&self, path: &str, auth_token: &str) -> Result<Vec<TimeBlock>> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await?;

        let blocks = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<TimeBlock>, _>>()?;

        Ok(blocks)
    }
}

/// UTC timestamp with a `Z` suffix, safe to embed in a PostgREST query string.
pub fn pg_timestamp(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}
