use std::time::Duration;

use crate::app_config::{AppConfig, PollSettings};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_poll = |interval_var: &str,
                      interval_default: &str,
                      max_wait_var: &str,
                      max_wait_default: &str|
     -> Result<PollSettings, ConfigError> {
        let interval_ms = parse_u64(interval_var, interval_default)?;
        if interval_ms == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: interval_var.to_string(),
                reason: "poll interval must be greater than zero".to_string(),
            });
        }
        let max_wait_secs = parse_u64(max_wait_var, max_wait_default)?;
        Ok(PollSettings::new(
            Duration::from_millis(interval_ms),
            Duration::from_secs(max_wait_secs),
        ))
    };

    let backend_url = require("ROUTEWIZ_BACKEND_URL")?;
    let log_level = or_default("ROUTEWIZ_LOG_LEVEL", "info");
    let request_timeout_secs = parse_u64("ROUTEWIZ_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("ROUTEWIZ_USER_AGENT", "routewiz/0.1 (route-planning)");
    let default_identity = lookup("ROUTEWIZ_IDENTITY")
        .ok()
        .filter(|v| !v.trim().is_empty());

    let validation_poll = parse_poll(
        "ROUTEWIZ_VALIDATION_POLL_INTERVAL_MS",
        "2000",
        "ROUTEWIZ_VALIDATION_MAX_WAIT_SECS",
        "600",
    )?;
    let retry_poll = parse_poll(
        "ROUTEWIZ_RETRY_POLL_INTERVAL_MS",
        "2000",
        "ROUTEWIZ_RETRY_MAX_WAIT_SECS",
        "300",
    )?;
    let route_poll = parse_poll(
        "ROUTEWIZ_ROUTE_POLL_INTERVAL_MS",
        "5000",
        "ROUTEWIZ_ROUTE_MAX_WAIT_SECS",
        "3600",
    )?;

    Ok(AppConfig {
        backend_url,
        log_level,
        request_timeout_secs,
        user_agent,
        default_identity,
        validation_poll,
        retry_poll,
        route_poll,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
