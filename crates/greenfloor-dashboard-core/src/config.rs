use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_COIN_PAGE_SIZE: u32 = 500;
pub const DEFAULT_NETWORK: &str = "mainnet";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("api base url must use http:// or https:// and include a host")]
    InvalidBaseUrl,
    #[error("poll interval must be at least {MIN_POLL_INTERVAL_MS}ms")]
    PollIntervalTooShort,
    #[error("coin page size must be positive")]
    EmptyCoinPage,
    #[error("network must not be empty")]
    EmptyNetwork,
    #[error("invalid dashboard config: {0}")]
    Malformed(String),
}

/// Runtime knobs for the dashboard. Every field has a default so a partial
/// object published by the host page is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub api_base_url: String,
    pub poll_interval_ms: u64,
    pub coin_page_size: u32,
    pub offers_limit: u32,
    pub offers_events_limit: u32,
    pub native_precision: u32,
    pub token_precision: u32,
    pub split_suggestion_buffer: u64,
    pub preflight_autoconfirm_ms: u64,
    pub trigger_feedback_ms: u64,
    pub network: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            coin_page_size: DEFAULT_COIN_PAGE_SIZE,
            offers_limit: 50,
            offers_events_limit: 30,
            native_precision: 12,
            token_precision: 3,
            split_suggestion_buffer: 2,
            preflight_autoconfirm_ms: 1_200,
            trigger_feedback_ms: 3_000,
            network: DEFAULT_NETWORK.to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|error| ConfigError::Malformed(error.to_string()))?;
        config.validated()
    }

    /// Applies `api=`, `poll_ms=` and `network=` overrides from a URL query string.
    pub fn apply_query(mut self, query: &str) -> Result<Self, ConfigError> {
        for pair in query.trim_start_matches('?').split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(value.trim())
                .map_err(|_| ConfigError::Malformed(format!("{key} is not valid utf-8")))?;
            let value = value.trim();
            match key {
                "api" => self.api_base_url = value.to_string(),
                "poll_ms" => {
                    self.poll_interval_ms = value
                        .parse()
                        .map_err(|_| ConfigError::Malformed(format!("poll_ms={value}")))?;
                }
                "network" => self.network = value.to_string(),
                _ => {}
            }
        }
        self.validated()
    }

    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.api_base_url = normalize_base_url(&self.api_base_url)?;
        if self.poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(ConfigError::PollIntervalTooShort);
        }
        if self.coin_page_size == 0 {
            return Err(ConfigError::EmptyCoinPage);
        }
        self.network = self.network.trim().to_string();
        if self.network.is_empty() {
            return Err(ConfigError::EmptyNetwork);
        }
        Ok(self)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn preflight_autoconfirm(&self) -> Duration {
        Duration::from_millis(self.preflight_autoconfirm_ms)
    }

    pub fn trigger_feedback(&self) -> Duration {
        Duration::from_millis(self.trigger_feedback_ms)
    }
}

/// Empty means same origin. Otherwise trims, drops trailing slashes and
/// requires an http(s) scheme followed by a host.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(String::new());
    }
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl);
    }
    let Some((_, remainder)) = trimmed.split_once("://") else {
        return Err(ConfigError::InvalidBaseUrl);
    };
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(ConfigError::InvalidBaseUrl);
    }
    Ok(trimmed.to_string())
}
