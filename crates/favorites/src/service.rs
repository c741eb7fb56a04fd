//! Favorites operations composed from the client, retry and verification.

use async_trait::async_trait;
use autotrader_core::favorites::{
    parse_listing_id, FavoriteStatus, FavoriteTarget, UserFavorites,
};
use autotrader_core::session::SessionProvider;
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::client::FavoritesClient;
use crate::config::FavoritesConfig;
use crate::error::{FavoritesError, Result};
use crate::normalize::{parse_favorite_status, parse_user_favorites};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::verify::{is_hibernate_serialization_error, Reconciler};

#[async_trait]
pub trait FavoritesServiceTrait: Send + Sync {
    /// Favorites a listing. Returns only once the server is known to hold the
    /// favorite, or with the error that prevented it.
    async fn add_to_favorites(&self, listing_id: &str) -> Result<()>;

    /// Removes a favorite, with the same guarantee as `add_to_favorites`.
    async fn remove_from_favorites(&self, listing_id: &str) -> Result<()>;

    /// Never fails: any problem reads as "not favorited".
    async fn is_favorited(&self, listing_id: &str) -> FavoriteStatus;

    async fn get_user_favorites(&self) -> Result<UserFavorites>;
}

#[derive(Clone)]
pub struct FavoritesService {
    client: FavoritesClient,
    sessions: Arc<dyn SessionProvider>,
    retry: RetryPolicy,
    reconciler: Reconciler,
}

impl FavoritesService {
    pub fn new(config: &FavoritesConfig, sessions: Arc<dyn SessionProvider>) -> Result<Self> {
        let client = FavoritesClient::new(config)?;
        Ok(Self::with_client(client, sessions, config.retry_policy()))
    }

    pub fn with_client(
        client: FavoritesClient,
        sessions: Arc<dyn SessionProvider>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(client.clone()),
            client,
            sessions,
            retry,
        }
    }

    fn validate_listing_id(listing_id: &str) -> Result<u64> {
        parse_listing_id(listing_id).ok_or_else(|| FavoritesError::invalid_input(listing_id))
    }

    fn require_token(&self) -> Result<String> {
        self.sessions
            .access_token()
            .ok_or_else(|| FavoritesError::unauthorized("User is not authenticated"))
    }

    async fn write(&self, listing_id: &str, target: FavoriteTarget) -> Result<()> {
        let numeric_id = Self::validate_listing_id(listing_id)?;
        let token = self.require_token()?;
        let verb = describe(target);

        debug!("[Favorites] {} favorite {}", verb, listing_id);
        let outcome = run_with_retry(
            &self.retry,
            || self.attempt_write(&token, numeric_id, target),
            FavoritesError::is_retryable,
        )
        .await;

        match outcome {
            Ok(()) => match self.reconciler.fetch_status(&token, numeric_id).await {
                Ok(actual) if target.matches(actual) => Ok(()),
                Ok(_) => Err(FavoritesError::verification_failed(format!(
                    "Operation completed but favorite was not {}",
                    past_tense(target)
                ))),
                // An unreadable status counts as "not favorited".
                Err(err) => {
                    warn!("[Favorites] Could not verify {} of {}: {}", verb, listing_id, err);
                    match target {
                        FavoriteTarget::Favorited => Err(FavoritesError::verification_failed(
                            "Operation completed but favorite was not added",
                        )),
                        FavoriteTarget::NotFavorited => Ok(()),
                    }
                }
            },
            Err(err) if err.is_authentication_error() => {
                Err(FavoritesError::unauthorized("Authentication required"))
            }
            Err(err @ FavoritesError::InvalidInput(_)) => Err(err),
            Err(err) => {
                if self.reconciler.confirms(&token, numeric_id, target).await {
                    info!(
                        "[Favorites] {} of {} reached the server despite error: {}",
                        verb, listing_id, err
                    );
                    return Ok(());
                }
                error!(
                    "[Favorites] {} of {} failed after {} attempts: {}",
                    verb,
                    listing_id,
                    self.retry.max_attempts(),
                    err
                );
                Err(err)
            }
        }
    }

    /// One request. A 500 carrying the serialization fingerprint is checked
    /// against server truth before it is treated as a failure.
    async fn attempt_write(
        &self,
        token: &str,
        listing_id: u64,
        target: FavoriteTarget,
    ) -> Result<()> {
        let response = match target {
            FavoriteTarget::Favorited => self.client.add_favorite(token, listing_id).await?,
            FavoriteTarget::NotFavorited => self.client.remove_favorite(token, listing_id).await?,
        };
        if response.is_success() {
            return Ok(());
        }

        if response.status == 500
            && is_hibernate_serialization_error(&response.body)
            && self.reconciler.confirms(token, listing_id, target).await
        {
            debug!(
                "[Favorites] Serialization error on listing {} but write committed",
                listing_id
            );
            return Ok(());
        }

        Err(FavoritesError::api(
            response.status,
            format!("Failed to {} favorite: {}", describe(target).to_lowercase(), response.body),
        ))
    }
}

fn describe(target: FavoriteTarget) -> &'static str {
    match target {
        FavoriteTarget::Favorited => "Add",
        FavoriteTarget::NotFavorited => "Remove",
    }
}

fn past_tense(target: FavoriteTarget) -> &'static str {
    match target {
        FavoriteTarget::Favorited => "added",
        FavoriteTarget::NotFavorited => "removed",
    }
}

#[async_trait]
impl FavoritesServiceTrait for FavoritesService {
    async fn add_to_favorites(&self, listing_id: &str) -> Result<()> {
        self.write(listing_id, FavoriteTarget::Favorited).await
    }

    async fn remove_from_favorites(&self, listing_id: &str) -> Result<()> {
        self.write(listing_id, FavoriteTarget::NotFavorited).await
    }

    async fn is_favorited(&self, listing_id: &str) -> FavoriteStatus {
        let not_favorited = FavoriteStatus::not_favorited(listing_id);

        let Some(numeric_id) = parse_listing_id(listing_id) else {
            error!("[Favorites] Invalid listing ID: {:?}", listing_id);
            return not_favorited;
        };
        let Some(token) = self.sessions.access_token() else {
            return not_favorited;
        };

        match self.client.check_favorite(&token, numeric_id).await {
            Ok(response) if response.is_success() => {
                FavoriteStatus::new(listing_id, parse_favorite_status(&response.body))
            }
            Ok(response) => {
                if response.status != 404 {
                    warn!(
                        "[Favorites] Failed to check favorite status: {}",
                        response.status
                    );
                }
                not_favorited
            }
            Err(err) => {
                warn!("[Favorites] Error checking favorite status: {}", err);
                not_favorited
            }
        }
    }

    async fn get_user_favorites(&self) -> Result<UserFavorites> {
        let token = self.require_token()?;

        let response = match self.client.list_favorites(&token).await {
            Ok(response) => response,
            Err(err) if err.is_authentication_error() => {
                return Err(FavoritesError::unauthorized("Authentication required"))
            }
            Err(err) => return Err(err),
        };

        if response.status == 401 {
            return Err(FavoritesError::unauthorized("Authentication required"));
        }
        if !response.is_success() {
            return Err(FavoritesError::api(
                response.status,
                format!("Failed to fetch favorites: {}", response.status),
            ));
        }

        Ok(parse_user_favorites(&response.body))
    }
}
