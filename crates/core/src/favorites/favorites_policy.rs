//! Retry and refresh policy helpers for favorites synchronization.

use serde::{Deserialize, Serialize};

/// Retries after the first attempt of a favorite write.
pub const FAVORITES_MAX_RETRIES: u32 = 2;

/// Delay before the first retry; doubled for each subsequent retry.
pub const FAVORITES_RETRY_BASE_DELAY_MS: u64 = 500;

/// Cadence of forced status re-checks while a session is present.
pub const FAVORITES_REFRESH_INTERVAL_SECS: u64 = 30;

/// How long a toggle keeps the button in its animating state.
pub const FAVORITE_ANIMATION_MS: u64 = 300;

/// Retry policy classification for favorites failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify an HTTP status into retry behavior.
///
/// Only authentication failures are final; every other server answer may be
/// a transient failure of a write that is safe to repeat.
pub fn classify_http_status(status: u16) -> RetryClass {
    match status {
        401 => RetryClass::ReauthRequired,
        _ => RetryClass::Retryable,
    }
}

/// Keywords that mark an error message as an authentication failure.
pub const AUTH_ERROR_KEYWORDS: [&str; 5] =
    ["unauthorized", "authentication", "auth", "login", "401"];

/// Returns true when a free-form error message reads like an authentication failure.
pub fn is_auth_error_message(message: &str) -> bool {
    let message = message.to_lowercase();
    AUTH_ERROR_KEYWORDS
        .iter()
        .any(|keyword| message.contains(keyword))
}

/// Exponential backoff before retry number `retry` (1-indexed), without jitter.
pub fn backoff_millis(base_delay_ms: u64, retry: u32) -> u64 {
    const MAX_EXPONENT: u32 = 16;

    let exponent = retry.saturating_sub(1).min(MAX_EXPONENT);
    base_delay_ms.saturating_mul(1_u64 << exponent)
}
