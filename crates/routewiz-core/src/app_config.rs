use std::time::Duration;

/// How often to poll one kind of backend job, and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl PollSettings {
    #[must_use]
    pub const fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    /// Initial address validation: every 2 s for up to 10 min.
    #[must_use]
    pub const fn validation() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(10 * 60))
    }

    /// Retry after corrections: every 2 s for up to 5 min.
    #[must_use]
    pub const fn retry_geocoding() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(5 * 60))
    }

    /// Route creation: every 5 s for up to 60 min.
    #[must_use]
    pub const fn route_creation() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(60 * 60))
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub log_level: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub default_identity: Option<String>,
    pub validation_poll: PollSettings,
    pub retry_poll: PollSettings,
    pub route_poll: PollSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("backend_url", &self.backend_url)
            .field("log_level", &self.log_level)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field(
                "default_identity",
                &self.default_identity.as_ref().map(|_| "[redacted]"),
            )
            .field("validation_poll", &self.validation_poll)
            .field("retry_poll", &self.retry_poll)
            .field("route_poll", &self.route_poll)
            .finish()
    }
}
