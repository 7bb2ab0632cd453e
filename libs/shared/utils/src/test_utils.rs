use std::sync::Arc;
use axum_extra::TypedHeader;
use chrono::{DateTime, NaiveTime, Utc};
use headers::{Authorization, authorization::Bearer};
use serde_json::json;
use uuid::Uuid;

use shared_config::{AppConfig, SchedulingConfig};

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub scheduling: SchedulingConfig,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            scheduling: SchedulingConfig::default(),
        }
    }
}

impl TestConfig {
    /// Points the config at a mock PostgREST server.
    pub fn with_url(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            api_port: 0,
            scheduling: self.scheduling.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub fn create_auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    let auth = Authorization::bearer(token).expect("valid bearer token");
    TypedHeader(auth)
}

/// PostgREST rows shaped like the `availability_rules`, `time_blocks` and
/// `appointments` tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn availability_rule_row(
        owner_id: Uuid,
        day_of_week: i32,
        start: NaiveTime,
        end: NaiveTime,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "owner_id": owner_id,
            "day_of_week": day_of_week,
            "start_time": start.format("%H:%M:%S").to_string(),
            "end_time": end.format("%H:%M:%S").to_string(),
            "is_active": true,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn time_block_row(
        owner_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        title: &str,
        block_type: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "owner_id": owner_id,
            "start_time": start.to_rfc3339(),
            "end_time": end.to_rfc3339(),
            "title": title,
            "block_type": block_type,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_row(
        owner_id: Uuid,
        start: DateTime<Utc>,
        duration_minutes: i32,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "owner_id": owner_id,
            "patient_id": Uuid::new_v4(),
            "scheduled_start": start.to_rfc3339(),
            "duration_minutes": duration_minutes,
            "status": status,
            "notes": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::with_url("http://127.0.0.1:9999");
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://127.0.0.1:9999");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(app_config.is_configured());
    }

    #[test]
    fn test_rule_row_formats_times() {
        let owner = Uuid::new_v4();
        let row = MockSupabaseResponses::availability_rule_row(
            owner,
            1,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 30, 0).unwrap(),
        );

        assert_eq!(row["start_time"], "09:00:00");
        assert_eq!(row["end_time"], "12:30:00");
        assert_eq!(row["owner_id"], json!(owner));
    }
}
