//! Tracker configuration loaded from environment variables.
//!
//! The surrounding application shell owns these values; the binary reads them
//! once at startup (optionally from a `.env` file).

use crate::models::ViewerRole;
use std::env;
use std::time::Duration;

/// Tracker configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the companion backend
    pub api_url: String,
    /// This device's phone number
    pub number: String,
    /// Role chosen on the role-selection screen
    pub role: ViewerRole,
    /// Selected target (supporters only)
    pub target_number: Option<String>,
    /// How often the last fix is pushed to the backend
    pub location_push_interval: Duration,
    /// How often failed fence-outs are checked for a retry
    pub exit_retry_interval: Duration,
    /// Upper bound on the fence-out retry backoff
    pub exit_retry_max_backoff: Duration,
    /// Longest home/center gap still reported as one move
    pub move_window: chrono::Duration,
    /// Per-request HTTP timeout
    pub http_timeout: Duration,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            api_url: "http://localhost:8080".to_string(),
            number: "01012345678".to_string(),
            role: ViewerRole::User,
            target_number: None,
            location_push_interval: Duration::from_secs(5),
            exit_retry_interval: Duration::from_secs(15),
            exit_retry_max_backoff: Duration::from_secs(300),
            move_window: chrono::Duration::minutes(60),
            http_timeout: Duration::from_secs(10),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let role = match env::var("PAYPASS_ROLE") {
            Ok(v) => v
                .parse()
                .map_err(|e: String| ConfigError::Invalid("PAYPASS_ROLE", e))?,
            Err(_) => ViewerRole::User,
        };

        Ok(Self {
            api_url: env::var("PAYPASS_API_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            number: env::var("PAYPASS_NUMBER")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("PAYPASS_NUMBER"))?,
            role,
            target_number: env::var("PAYPASS_TARGET_NUMBER")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            location_push_interval: Duration::from_secs(secs_var(
                "LOCATION_PUSH_INTERVAL_SECS",
                5,
            )?),
            exit_retry_interval: Duration::from_secs(secs_var("EXIT_RETRY_INTERVAL_SECS", 15)?),
            exit_retry_max_backoff: Duration::from_secs(secs_var(
                "EXIT_RETRY_MAX_BACKOFF_SECS",
                300,
            )?),
            move_window: minutes_var("MOVE_WINDOW_MINUTES", 60)?,
            http_timeout: Duration::from_secs(secs_var("HTTP_TIMEOUT_SECS", 10)?),
        })
    }
}

/// Read a positive integer variable, falling back to `default` when unset.
fn secs_var(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(v) => match v.trim().parse::<u64>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::Invalid(name, v)),
        },
        Err(_) => Ok(default),
    }
}

/// Read a positive number of minutes, falling back to `default` when unset.
fn minutes_var(name: &'static str, default: u64) -> Result<chrono::Duration, ConfigError> {
    let minutes = secs_var(name, default)?;
    i64::try_from(minutes)
        .ok()
        .and_then(chrono::Duration::try_minutes)
        .ok_or_else(|| ConfigError::Invalid(name, minutes.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
