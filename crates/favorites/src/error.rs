//! Error types for the favorites crate.

use autotrader_core::favorites::{classify_http_status, is_auth_error_message, RetryClass};
use thiserror::Error;

/// Result type alias for favorites operations.
pub type Result<T> = std::result::Result<T, FavoritesError>;

/// Errors that can occur while synchronizing favorites.
#[derive(Debug, Error)]
pub enum FavoritesError {
    /// Listing id is not a positive integer
    #[error("Invalid listing ID: {0}")]
    InvalidInput(String),

    /// Missing or rejected session
    #[error("Authentication error: {0}")]
    Unauthorized(String),

    /// Non-2xx response from the favorites API
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The server state still contradicts the intended end state
    #[error("Verification failed: {0}")]
    VerificationFailed(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl FavoritesError {
    pub fn invalid_input(listing_id: impl Into<String>) -> Self {
        Self::InvalidInput(listing_id.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    pub fn verification_failed(message: impl Into<String>) -> Self {
        Self::VerificationFailed(message.into())
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// Stable code callers can branch on.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_LISTING_ID",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Api { .. } => "API_ERROR",
            Self::VerificationFailed(_) => "VERIFICATION_FAILED",
            Self::Http(_) | Self::Unknown(_) => "UNKNOWN_ERROR",
        }
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            _ => None,
        }
    }

    /// True for failures that should send the user to sign-in.
    ///
    /// Besides the explicit kind and a 401 status, any error whose message
    /// mentions authentication counts, since the backend reports expired
    /// sessions with varying statuses.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Self::Unauthorized(_) => true,
            Self::InvalidInput(_) => false,
            Self::Api { status, .. } if *status == 401 => true,
            other => is_auth_error_message(&other.to_string()),
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> RetryClass {
        if self.is_authentication_error() {
            return RetryClass::ReauthRequired;
        }
        match self {
            Self::InvalidInput(_) => RetryClass::Permanent,
            Self::Api { status, .. } => classify_http_status(*status),
            _ => RetryClass::Retryable,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retry_class() == RetryClass::Retryable
    }
}
