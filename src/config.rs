use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: String,
    pub admin_token: String,
    /// Minimum gap between "now" and the start of a bookable slot.
    pub min_lead_minutes: i64,
    pub default_availability_days: u32,
    pub max_availability_days: u32,
    /// Offset of the business's local time from UTC.
    pub utc_offset_minutes: i32,
    pub storage_retry_attempts: u32,
    /// 0 disables the availability read cache.
    pub availability_cache_ttl_secs: u64,
    pub reminder_lead_minutes: i64,
    pub reminder_poll_secs: u64,
    /// Empty means reminders are only logged.
    pub reminder_webhook_url: String,
    pub reminder_webhook_token: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            database_url: "washbay.db".to_string(),
            admin_token: "changeme".to_string(),
            min_lead_minutes: 120,
            default_availability_days: 5,
            max_availability_days: 30,
            utc_offset_minutes: 0,
            storage_retry_attempts: 3,
            availability_cache_ttl_secs: 0,
            reminder_lead_minutes: 60,
            reminder_poll_secs: 300,
            reminder_webhook_url: String::new(),
            reminder_webhook_token: String::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: parse_var("PORT", defaults.port),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            admin_token: env::var("ADMIN_TOKEN").unwrap_or(defaults.admin_token),
            min_lead_minutes: parse_var("MIN_LEAD_MINUTES", defaults.min_lead_minutes),
            default_availability_days: parse_var(
                "DEFAULT_AVAILABILITY_DAYS",
                defaults.default_availability_days,
            ),
            max_availability_days: parse_var("MAX_AVAILABILITY_DAYS", defaults.max_availability_days),
            utc_offset_minutes: parse_var("UTC_OFFSET_MINUTES", defaults.utc_offset_minutes),
            storage_retry_attempts: parse_var(
                "STORAGE_RETRY_ATTEMPTS",
                defaults.storage_retry_attempts,
            ),
            availability_cache_ttl_secs: parse_var(
                "AVAILABILITY_CACHE_TTL_SECS",
                defaults.availability_cache_ttl_secs,
            ),
            reminder_lead_minutes: parse_var(
                "REMINDER_LEAD_MINUTES",
                defaults.reminder_lead_minutes,
            ),
            reminder_poll_secs: parse_var("REMINDER_POLL_SECS", defaults.reminder_poll_secs),
            reminder_webhook_url: env::var("REMINDER_WEBHOOK_URL").unwrap_or_default(),
            reminder_webhook_token: env::var("REMINDER_WEBHOOK_TOKEN").unwrap_or_default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(var = name, value = %raw, "ignoring unparseable config value");
                default
            }
        },
        Err(_) => default,
    }
}
