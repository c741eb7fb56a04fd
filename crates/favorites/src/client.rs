//! HTTP client for the marketplace favorites API.
//!
//! Thin wrapper: it attaches the bearer token and hands back status and raw
//! body. Interpreting bodies is left to the normalizer and the service.

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use std::time::Duration;

use crate::config::FavoritesConfig;
use crate::error::{FavoritesError, Result};

const MAX_LOG_BODY_CHARS: usize = 512;

/// Primary favorites list path.
pub const FAVORITES_LIST_PATH: &str = "/api/favorites";

/// Legacy list path still served by older backend revisions.
pub const LEGACY_FAVORITES_LIST_PATH: &str = "/api/favorites/user";

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct FavoritesClient {
    client: reqwest::Client,
    base_url: String,
}

impl FavoritesClient {
    fn log_response(method: &str, url: &str, status: u16, body: &str) {
        if (200..300).contains(&status) {
            debug!("[Favorites] {} {} -> {}", method, url, status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!(
            "[Favorites] {} {} -> error ({}): {}",
            method, url, status, preview
        );
    }

    /// Create a client for `config.base_url` (e.g. "https://api.example.com").
    pub fn new(config: &FavoritesConfig) -> Result<Self> {
        Self::with_timeout(&config.base_url, config.request_timeout)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self, token: &str) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| FavoritesError::unauthorized("Invalid access token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(headers)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &str,
    ) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        let method_name = method.to_string();

        let response = self
            .client
            .request(method, &url)
            .headers(self.headers(token)?)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Self::log_response(&method_name, &url, status, &body);

        Ok(RawResponse { status, body })
    }

    /// Add a listing to the user's favorites.
    ///
    /// POST /api/favorites/{id}
    pub async fn add_favorite(&self, token: &str, listing_id: u64) -> Result<RawResponse> {
        self.send(
            reqwest::Method::POST,
            &format!("/api/favorites/{}", listing_id),
            token,
        )
        .await
    }

    /// Remove a listing from the user's favorites.
    ///
    /// DELETE /api/favorites/{id}
    pub async fn remove_favorite(&self, token: &str, listing_id: u64) -> Result<RawResponse> {
        self.send(
            reqwest::Method::DELETE,
            &format!("/api/favorites/{}", listing_id),
            token,
        )
        .await
    }

    /// Check whether a listing is favorited.
    ///
    /// GET /api/favorites/check/{id}
    pub async fn check_favorite(&self, token: &str, listing_id: u64) -> Result<RawResponse> {
        self.send(
            reqwest::Method::GET,
            &format!("/api/favorites/check/{}", listing_id),
            token,
        )
        .await
    }

    /// List the user's favorites, falling back to the legacy path when the
    /// primary one is not served.
    ///
    /// GET /api/favorites, then GET /api/favorites/user on 404
    pub async fn list_favorites(&self, token: &str) -> Result<RawResponse> {
        let response = self
            .send(reqwest::Method::GET, FAVORITES_LIST_PATH, token)
            .await?;
        if response.status != 404 {
            return Ok(response);
        }

        debug!(
            "[Favorites] {} not found, trying {}",
            FAVORITES_LIST_PATH, LEGACY_FAVORITES_LIST_PATH
        );
        self.send(reqwest::Method::GET, LEGACY_FAVORITES_LIST_PATH, token)
            .await
    }
}
