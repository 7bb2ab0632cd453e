use std::env;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub api_port: u16,
    pub scheduling: SchedulingConfig,
}

/// Defaults applied by slot enumeration and next-slot search when the caller
/// leaves a parameter out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingConfig {
    pub default_duration_minutes: i64,
    pub default_interval_minutes: i64,
    pub max_days_ahead: u32,
    /// Ceiling on a caller-supplied search horizon.
    pub max_search_days: u32,
    /// How far before a range start appointments are fetched so that a long
    /// appointment starting earlier is still seen as overlapping.
    pub appointment_lookback_hours: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: 30,
            default_interval_minutes: 30,
            max_days_ahead: 30,
            max_search_days: 365,
            appointment_lookback_hours: 24,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = SchedulingConfig::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            api_port: parse_or("API_PORT", 3000),
            scheduling: SchedulingConfig {
                default_duration_minutes: parse_or(
                    "SCHEDULING_DEFAULT_DURATION_MINUTES",
                    defaults.default_duration_minutes,
                ),
                default_interval_minutes: parse_or(
                    "SCHEDULING_DEFAULT_INTERVAL_MINUTES",
                    defaults.default_interval_minutes,
                ),
                max_days_ahead: parse_or("SCHEDULING_MAX_DAYS_AHEAD", defaults.max_days_ahead),
                max_search_days: parse_or("SCHEDULING_MAX_SEARCH_DAYS", defaults.max_search_days),
                appointment_lookback_hours: parse_or(
                    "SCHEDULING_APPOINTMENT_LOOKBACK_HOURS",
                    defaults.appointment_lookback_hours,
                ),
            },
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}
