//! Single-slot store for a favorite intent captured while signed out.

use autotrader_core::favorites::{
    PendingActionKind, PendingFavoriteAction, PENDING_FAVORITE_ACTION_KEY,
};
use autotrader_core::storage::LocalStore;
use chrono::Utc;
use log::{debug, error, warn};
use std::sync::Arc;
use std::time::Duration;

/// Holds at most one pending "add" intent. A new intent replaces the old one.
#[derive(Clone)]
pub struct PendingActionStore {
    storage: Arc<dyn LocalStore>,
    max_age: Option<Duration>,
}

impl PendingActionStore {
    pub fn new(storage: Arc<dyn LocalStore>) -> Self {
        Self {
            storage,
            max_age: None,
        }
    }

    /// Discard matching intents older than `max_age` instead of replaying them.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Record an intent to favorite `listing_id`, overwriting any earlier one.
    pub fn store(&self, listing_id: &str) {
        let action = PendingFavoriteAction::add(listing_id);
        let json = match serde_json::to_string(&action) {
            Ok(json) => json,
            Err(err) => {
                error!("[Favorites] Failed to encode pending action: {}", err);
                return;
            }
        };
        match self.storage.set_item(PENDING_FAVORITE_ACTION_KEY, &json) {
            Ok(()) => debug!("[Favorites] Stored pending 'add' action for {}", listing_id),
            Err(err) => warn!("[Favorites] Failed to store pending action: {}", err),
        }
    }

    /// Read the stored intent without consuming it.
    pub fn peek(&self) -> Option<PendingFavoriteAction> {
        let raw = self.read_raw()?;
        serde_json::from_str(&raw).ok()
    }

    /// Consume the stored intent if it belongs to `listing_id`.
    ///
    /// The entry is deleted before it is returned so an interrupted replay is
    /// never attempted twice. Intents for other listings stay in place.
    pub fn drain(&self, listing_id: &str) -> Option<PendingFavoriteAction> {
        let raw = self.read_raw()?;

        let action = match serde_json::from_str::<PendingFavoriteAction>(&raw) {
            Ok(action) => action,
            Err(err) => {
                error!("[Favorites] Error parsing pending favorite action: {}", err);
                self.clear();
                return None;
            }
        };

        if action.listing_id != listing_id {
            return None;
        }

        if action.action != PendingActionKind::Add {
            warn!(
                "[Favorites] Invalid or unexpected pending action found: {:?}",
                action
            );
            self.clear();
            return None;
        }

        self.clear();

        if let Some(max_age) = self.max_age {
            let age = action.age_millis(Utc::now().timestamp_millis());
            if u128::from(age.unsigned_abs()) > max_age.as_millis() {
                debug!(
                    "[Favorites] Stale pending action ignored ({} ms old): {:?}",
                    age, action
                );
                return None;
            }
        }

        Some(action)
    }

    pub fn clear(&self) {
        if let Err(err) = self.storage.remove_item(PENDING_FAVORITE_ACTION_KEY) {
            warn!("[Favorites] Failed to remove pending action: {}", err);
        }
    }

    fn read_raw(&self) -> Option<String> {
        match self.storage.get_item(PENDING_FAVORITE_ACTION_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("[Favorites] Failed to read pending action: {}", err);
                None
            }
        }
    }
}
