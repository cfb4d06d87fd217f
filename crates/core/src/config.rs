use std::time::Duration;

use reqwest::Url;

use crate::error::{CaptionError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8011";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Video inference may take minutes.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(300);
pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(6);
pub const DEFAULT_NOTIFICATION_HISTORY: usize = 32;

pub const ENV_API_URL: &str = "CAPTIONDESK_API_URL";
pub const ENV_POLL_SECS: &str = "CAPTIONDESK_POLL_SECS";
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "CAPTIONDESK_REQUEST_TIMEOUT_SECS";
pub const ENV_GENERATION_TIMEOUT_SECS: &str = "CAPTIONDESK_GENERATION_TIMEOUT_SECS";
pub const ENV_NOTIFY_SECS: &str = "CAPTIONDESK_NOTIFY_SECS";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: Url,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub generation_timeout: Duration,
    pub notification_ttl: Duration,
    pub notification_history: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            notification_ttl: DEFAULT_NOTIFICATION_TTL,
            notification_history: DEFAULT_NOTIFICATION_HISTORY,
        }
    }
}

impl Config {
    /// Defaults overridden by `CAPTIONDESK_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(url) = lookup(ENV_API_URL) {
            config = config.with_api_url(&url)?;
        }
        if let Some(secs) = lookup(ENV_POLL_SECS) {
            config.poll_interval = parse_secs(ENV_POLL_SECS, &secs)?;
        }
        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            config.request_timeout = parse_secs(ENV_REQUEST_TIMEOUT_SECS, &secs)?;
        }
        if let Some(secs) = lookup(ENV_GENERATION_TIMEOUT_SECS) {
            config.generation_timeout = parse_secs(ENV_GENERATION_TIMEOUT_SECS, &secs)?;
        }
        if let Some(secs) = lookup(ENV_NOTIFY_SECS) {
            config.notification_ttl = parse_secs(ENV_NOTIFY_SECS, &secs)?;
        }

        Ok(config)
    }

    pub fn with_api_url(mut self, raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| CaptionError::InvalidConfig {
            key: ENV_API_URL.to_string(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(CaptionError::InvalidConfig {
                key: ENV_API_URL.to_string(),
                reason: format!("{raw} cannot be used as a base url"),
            });
        }
        self.api_url = url;
        Ok(self)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    let secs: u64 = raw.trim().parse().map_err(|_| CaptionError::InvalidConfig {
        key: key.to_string(),
        reason: format!("expected a whole number of seconds, got {raw:?}"),
    })?;
    if secs == 0 {
        return Err(CaptionError::InvalidConfig {
            key: key.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
