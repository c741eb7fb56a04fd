//! Runtime configuration for the favorites client.

use autotrader_core::favorites::{
    FAVORITES_MAX_RETRIES, FAVORITES_REFRESH_INTERVAL_SECS, FAVORITES_RETRY_BASE_DELAY_MS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryPolicy;

/// API base URL used when no environment override is present.
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Sign-in route the controller redirects to when a signed-out user toggles.
pub const DEFAULT_SIGN_IN_PATH: &str = "/auth/signin";

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FavoritesConfig {
    pub base_url: String,
    pub max_retries: u32,
    #[serde(with = "duration_millis")]
    pub retry_base_delay: Duration,
    #[serde(with = "duration_millis")]
    pub request_timeout: Duration,
    #[serde(with = "duration_millis")]
    pub refresh_interval: Duration,
    pub sign_in_path: String,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            max_retries: FAVORITES_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(FAVORITES_RETRY_BASE_DELAY_MS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            refresh_interval: Duration::from_secs(FAVORITES_REFRESH_INTERVAL_SECS),
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
        }
    }
}

impl FavoritesConfig {
    /// Defaults with the base URL taken from `FAVORITES_API_URL`, then
    /// `NEXT_PUBLIC_API_URL`, then [`DEFAULT_API_URL`].
    pub fn from_env() -> Self {
        let base_url = ["FAVORITES_API_URL", "NEXT_PUBLIC_API_URL"]
            .iter()
            .find_map(|name| env_base_url(name))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        Self::default().with_base_url(&base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_base_url(base_url);
        self
    }

    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_base_delay = base_delay;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base_delay)
    }
}

fn env_base_url(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| normalize_base_url(&v))
        .filter(|v| !v.is_empty())
}

fn normalize_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
