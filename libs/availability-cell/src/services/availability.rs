use std::sync::Arc;

use anyhow::{Result, anyhow};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{
    WeeklyAvailabilityRule, CreateAvailabilityRuleRequest, UpdateAvailabilityRuleRequest,
    AvailabilityError, validate_rule_window,
};

const RULES_PATH: &str = "/rest/v1/availability_rules";

pub struct AvailabilityService {
    supabase: Arc<SupabaseClient>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::from_client(Arc::new(SupabaseClient::new(config)))
    }

    pub fn from_client(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    /// Create a weekly availability rule. Overlapping rules on the same day
    /// are accepted as-is; each one is expanded independently.
    pub async fn create_rule(
        &self,
        owner_id: Uuid,
        request: CreateAvailabilityRuleRequest,
        auth_token: &str,
    ) -> Result<WeeklyAvailabilityRule> {
        debug!("Creating availability rule for owner: {}", owner_id);

        validate_rule_window(request.day_of_week, request.start_time, request.end_time)?;

        let now = Utc::now().to_rfc3339();
        let rule_data = json!({
            "owner_id": owner_id,
            "day_of_week": request.day_of_week,
            "start_time": request.start_time.format("%H:%M:%S").to_string(),
            "end_time": request.end_time.format("%H:%M:%S").to_string(),
            "is_active": request.is_active.unwrap_or(true),
            "created_at": now,
            "updated_at": now
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            RULES_PATH,
            Some(auth_token),
            Some(rule_data),
            Some(return_representation()),
        ).await?;

        let rule = first_row::<WeeklyAvailabilityRule>(result)
            .ok_or_else(|| anyhow!("Failed to create availability rule"))??;
        debug!("Availability rule created with ID: {}", rule.id);

        Ok(rule)
    }

    /// Update an existing rule. The resulting window is validated against the
    /// stored values for any field the request leaves out.
    pub async fn update_rule(
        &self,
        rule_id: Uuid,
        request: UpdateAvailabilityRuleRequest,
        auth_token: &str,
    ) -> Result<WeeklyAvailabilityRule> {
        debug!("Updating availability rule: {}", rule_id);

        let existing = self.get_rule_by_id(rule_id, auth_token).await?;

        validate_rule_window(
            request.day_of_week.unwrap_or(existing.day_of_week),
            request.start_time.unwrap_or(existing.start_time),
            request.end_time.unwrap_or(existing.end_time),
        )?;

        let mut update_data = serde_json::Map::new();

        if let Some(day) = request.day_of_week {
            update_data.insert("day_of_week".to_string(), json!(day));
        }
        if let Some(start) = request.start_time {
            update_data.insert("start_time".to_string(), json!(start.format("%H:%M:%S").to_string()));
        }
        if let Some(end) = request.end_time {
            update_data.insert("end_time".to_string(), json!(end.format("%H:%M:%S").to_string()));
        }
        if let Some(active) = request.is_active {
            update_data.insert("is_active".to_string(), json!(active));
        }

        update_data.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("{}?id=eq.{}", RULES_PATH, rule_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(return_representation()),
        ).await?;

        first_row::<WeeklyAvailabilityRule>(result)
            .ok_or_else(|| anyhow!("Failed to update availability rule"))?
    }

    /// All rules of an owner, active or not, ordered for calendar display.
    pub async fn list_rules(
        &self,
        owner_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<WeeklyAvailabilityRule>> {
        debug!("Fetching availability rules for owner: {}", owner_id);

        let path = format!(
            "{}?owner_id=eq.{}&order=day_of_week.asc,start_time.asc",
            RULES_PATH, owner_id
        );
        self.fetch_rules(&path, auth_token).await
    }

    /// Active rules for one weekday, ascending by start time.
    pub async fn list_active_rules_for_day(
        &self,
        owner_id: Uuid,
        day_of_week: i32,
        auth_token: &str,
    ) -> Result<Vec<WeeklyAvailabilityRule>> {
        debug!("Fetching active rules for owner {} on day {}", owner_id, day_of_week);

        let path = format!(
            "{}?owner_id=eq.{}&day_of_week=eq.{}&is_active=eq.true&order=start_time.asc",
            RULES_PATH, owner_id, day_of_week
        );
        self.fetch_rules(&path, auth_token).await
    }

    pub async fn get_rule_by_id(
        &self,
        rule_id: Uuid,
        auth_token: &str,
    ) -> Result<WeeklyAvailabilityRule> {
        let path = format!("{}?id=eq.{}", RULES_PATH, rule_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        first_row::<WeeklyAvailabilityRule>(result).ok_or(AvailabilityError::RuleNotFound)?
    }

    pub async fn delete_rule(
        &self,
        rule_id: Uuid,
        auth_token: &str,
    ) -> Result<()> {
        debug!("Deleting availability rule: {}", rule_id);

        let path = format!("{}?id=eq.{}", RULES_PATH, rule_id);
        self.supabase.execute(Method::DELETE, &path, Some(auth_token)).await
    }

    async fn fetch_rules(&self, path: &str, auth_token: &str) -> Result<Vec<WeeklyAvailabilityRule>> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            path,
            Some(auth_token),
            None,
        ).await?;

        let rules = result.into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<WeeklyAvailabilityRule>, _>>()?;

        Ok(rules)
    }
}

/// Decodes the first row of a PostgREST response, if any.
pub(crate) fn first_row<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Option<Result<T>> {
    rows.into_iter()
        .next()
        .map(|row| serde_json::from_value(row).map_err(Into::into))
}
