//! Re-reads server truth after a favorite write.
//!
//! The backend can commit a favorite and then fail to serialize its response,
//! so an HTTP status alone never decides whether a write took effect.

use autotrader_core::favorites::FavoriteTarget;
use log::{debug, warn};

use crate::client::FavoritesClient;
use crate::error::{FavoritesError, Result};
use crate::normalize::parse_favorite_status;

/// Fragments identifying the backend's lazy-proxy serialization failure.
pub const HIBERNATE_ERROR_MARKERS: [&str; 6] = [
    "HibernateProxy",
    "hibernateLazyInitializer",
    "ByteBuddyInterceptor",
    "could not initialize proxy",
    "LazyInitializationException",
    "No serializer found for class org.hibernate",
];

/// True when a 500 body looks like the write committed but its response
/// could not be serialized.
pub fn is_hibernate_serialization_error(body: &str) -> bool {
    HIBERNATE_ERROR_MARKERS
        .iter()
        .any(|marker| body.contains(marker))
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    client: FavoritesClient,
}

impl Reconciler {
    pub fn new(client: FavoritesClient) -> Self {
        Self { client }
    }

    /// Strict status read: unlike the UI-facing check, failures are reported.
    /// A 404 means the listing is not among the user's favorites.
    pub async fn fetch_status(&self, token: &str, listing_id: u64) -> Result<bool> {
        let response = self.client.check_favorite(token, listing_id).await?;
        if response.is_success() {
            return Ok(parse_favorite_status(&response.body));
        }
        if response.status == 404 {
            return Ok(false);
        }
        Err(FavoritesError::api(
            response.status,
            format!("Failed to check favorite status: {}", response.body),
        ))
    }

    /// True only if a fresh read shows `target` already holds. A failed read
    /// confirms nothing.
    pub async fn confirms(&self, token: &str, listing_id: u64, target: FavoriteTarget) -> bool {
        match self.fetch_status(token, listing_id).await {
            Ok(actual) => {
                debug!(
                    "[Favorites] Verification for {}: server says favorite={}, wanted {:?}",
                    listing_id, actual, target
                );
                target.matches(actual)
            }
            Err(err) => {
                warn!(
                    "[Favorites] Could not verify favorite state for {}: {}",
                    listing_id, err
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{start_mock_server, MockResponse, HIBERNATE_PROXY_ERROR_BODY};
    use std::time::Duration;

    #[test]
    fn detects_hibernate_fingerprint() {
        assert!(is_hibernate_serialization_error(HIBERNATE_PROXY_ERROR_BODY));
        assert!(is_hibernate_serialization_error(
            "org.hibernate.LazyInitializationException: could not initialize proxy - no Session"
        ));
        assert!(!is_hibernate_serialization_error(
            r#"{"message":"Listing not found"}"#
        ));
    }

    #[tokio::test]
    async fn confirms_matching_state() {
        let server = start_mock_server(vec![
            MockResponse::json(200, r#"{"isFavorite":true}"#),
            MockResponse::json(200, "false"),
        ])
        .await;
        let client =
            FavoritesClient::with_timeout(&server.base_url, Duration::from_secs(5)).unwrap();
        let reconciler = Reconciler::new(client);

        assert!(reconciler.confirms("t", 42, FavoriteTarget::Favorited).await);
        assert!(!reconciler.confirms("t", 42, FavoriteTarget::Favorited).await);
    }

    #[tokio::test]
    async fn failed_read_never_confirms_removal() {
        let server = start_mock_server(vec![MockResponse::json(503, "unavailable")]).await;
        let client =
            FavoritesClient::with_timeout(&server.base_url, Duration::from_secs(5)).unwrap();
        let reconciler = Reconciler::new(client);

        assert!(!reconciler.confirms("t", 42, FavoriteTarget::NotFavorited).await);
    }

    #[tokio::test]
    async fn not_found_reads_as_not_favorited() {
        let server = start_mock_server(vec![MockResponse::json(404, "")]).await;
        let client =
            FavoritesClient::with_timeout(&server.base_url, Duration::from_secs(5)).unwrap();
        let reconciler = Reconciler::new(client);

        assert!(!reconciler.fetch_status("t", 42).await.unwrap());
    }
}
