//! Decoding of the favorites API's heterogeneous response bodies.
//!
//! The backend has changed its response shapes between revisions. Every
//! accepted shape is an arm of an untagged enum with an explicit fallback,
//! and unrecognized bodies decode to "not favorited" / "no favorites"
//! instead of failing.

use autotrader_core::favorites::{Listing, UserFavorites};
use log::{debug, warn};
use serde::Deserialize;

/// Accepted shapes of `GET /api/favorites/check/{id}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawFavoriteStatus {
    Flag(bool),
    IsFavorite {
        #[serde(rename = "isFavorite")]
        is_favorite: bool,
    },
    Favorited {
        favorited: bool,
    },
    Other(serde_json::Value),
}

/// Accepted shapes of the favorites list endpoints.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawUserFavorites {
    List(Vec<Listing>),
    Favorites {
        favorites: Vec<Listing>,
        #[serde(default)]
        total: Option<usize>,
    },
    Data {
        data: Vec<Listing>,
        #[serde(default)]
        total: Option<usize>,
    },
    Other(serde_json::Value),
}

/// Decodes a status-check body into "is favorited".
pub fn parse_favorite_status(body: &str) -> bool {
    match body {
        "true" => return true,
        "false" => return false,
        _ => {}
    }

    match serde_json::from_str::<RawFavoriteStatus>(body) {
        Ok(RawFavoriteStatus::Flag(value))
        | Ok(RawFavoriteStatus::IsFavorite { is_favorite: value })
        | Ok(RawFavoriteStatus::Favorited { favorited: value }) => value,
        Ok(RawFavoriteStatus::Other(value)) => {
            debug!("[Favorites] Unrecognized status response shape: {}", value);
            false
        }
        Err(_) => false,
    }
}

/// Decodes a favorites-list body.
pub fn parse_user_favorites(body: &str) -> UserFavorites {
    if body.trim().is_empty() {
        return UserFavorites::empty();
    }

    match serde_json::from_str::<RawUserFavorites>(body) {
        Ok(RawUserFavorites::List(favorites)) => UserFavorites {
            total: favorites.len(),
            favorites,
        },
        Ok(RawUserFavorites::Favorites { favorites, total })
        | Ok(RawUserFavorites::Data {
            data: favorites,
            total,
        }) => UserFavorites {
            total: total.unwrap_or(favorites.len()),
            favorites,
        },
        Ok(RawUserFavorites::Other(_)) => UserFavorites::empty(),
        Err(err) => {
            warn!("[Favorites] Error parsing favorites response: {}", err);
            UserFavorites::empty()
        }
    }
}
