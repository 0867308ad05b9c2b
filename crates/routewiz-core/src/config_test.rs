use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("ROUTEWIZ_BACKEND_URL", "https://backend.example.com/api");
    m
}

#[test]
fn build_app_config_fails_without_backend_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "ROUTEWIZ_BACKEND_URL"),
        "expected MissingEnvVar(ROUTEWIZ_BACKEND_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_backend_url_as_missing() {
    let mut map = full_env();
    map.insert("ROUTEWIZ_BACKEND_URL", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::MissingEnvVar(_))));
}

#[test]
fn build_app_config_succeeds_with_defaults() {
    let map = full_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.backend_url, "https://backend.example.com/api");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "routewiz/0.1 (route-planning)");
    assert!(cfg.default_identity.is_none());
    assert_eq!(cfg.validation_poll, PollSettings::validation());
    assert_eq!(cfg.retry_poll, PollSettings::retry_geocoding());
    assert_eq!(cfg.route_poll, PollSettings::route_creation());
}

#[test]
fn poll_defaults_match_observed_cadence() {
    assert_eq!(PollSettings::validation().interval, Duration::from_secs(2));
    assert_eq!(PollSettings::validation().max_wait, Duration::from_secs(600));
    assert_eq!(PollSettings::retry_geocoding().max_wait, Duration::from_secs(300));
    assert_eq!(PollSettings::route_creation().interval, Duration::from_secs(5));
    assert_eq!(PollSettings::route_creation().max_wait, Duration::from_secs(3600));
}

#[test]
fn validation_poll_override() {
    let mut map = full_env();
    map.insert("ROUTEWIZ_VALIDATION_POLL_INTERVAL_MS", "500");
    map.insert("ROUTEWIZ_VALIDATION_MAX_WAIT_SECS", "60");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.validation_poll.interval, Duration::from_millis(500));
    assert_eq!(cfg.validation_poll.max_wait, Duration::from_secs(60));
}

#[test]
fn route_poll_interval_invalid() {
    let mut map = full_env();
    map.insert("ROUTEWIZ_ROUTE_POLL_INTERVAL_MS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "ROUTEWIZ_ROUTE_POLL_INTERVAL_MS"),
        "expected InvalidEnvVar(ROUTEWIZ_ROUTE_POLL_INTERVAL_MS), got: {result:?}"
    );
}

#[test]
fn zero_poll_interval_is_rejected() {
    let mut map = full_env();
    map.insert("ROUTEWIZ_RETRY_POLL_INTERVAL_MS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "ROUTEWIZ_RETRY_POLL_INTERVAL_MS"),
        "expected InvalidEnvVar(ROUTEWIZ_RETRY_POLL_INTERVAL_MS), got: {result:?}"
    );
}

#[test]
fn request_timeout_invalid() {
    let mut map = full_env();
    map.insert("ROUTEWIZ_REQUEST_TIMEOUT_SECS", "-5");
    let result = build_app_config(lookup_from_map(&map));
    assert!(matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "ROUTEWIZ_REQUEST_TIMEOUT_SECS"));
}

#[test]
fn identity_override() {
    let mut map = full_env();
    map.insert("ROUTEWIZ_IDENTITY", "dispatcher@example.com");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.default_identity.as_deref(), Some("dispatcher@example.com"));
}

#[test]
fn debug_output_redacts_identity() {
    let mut map = full_env();
    map.insert("ROUTEWIZ_IDENTITY", "dispatcher@example.com");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("dispatcher@example.com"));
    assert!(debug.contains("[redacted]"));
}
