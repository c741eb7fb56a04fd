//! Favorites synchronization for marketplace listings.
//!
//! Writes go through a bounded retry loop and are reconciled against a fresh
//! status read, since the backend can commit a favorite and still answer 500.
//! Intents captured while signed out are kept in a single-slot store and
//! replayed once a session appears.

pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod navigation;
pub mod normalize;
pub mod pending;
pub mod retry;
pub mod service;
pub mod verify;

#[cfg(test)]
mod test_support;

pub use client::{FavoritesClient, RawResponse};
pub use config::FavoritesConfig;
pub use controller::{
    ControllerOptions, FavoriteController, FavoritePhase, FavoriteView, ToggleOutcome, Visibility,
};
pub use error::{FavoritesError, Result};
pub use navigation::SignInNavigator;
pub use pending::PendingActionStore;
pub use retry::{run_with_retry, RetryPolicy};
pub use service::{FavoritesService, FavoritesServiceTrait};
pub use verify::Reconciler;
