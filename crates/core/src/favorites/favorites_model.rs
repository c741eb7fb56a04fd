//! Favorites domain models.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Storage key holding the single pending favorite intent.
pub const PENDING_FAVORITE_ACTION_KEY: &str = "pendingFavoriteAction";

/// Favorite state of one listing for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteStatus {
    pub listing_id: String,
    pub is_favorite: bool,
}

impl FavoriteStatus {
    pub fn new(listing_id: impl Into<String>, is_favorite: bool) -> Self {
        Self {
            listing_id: listing_id.into(),
            is_favorite,
        }
    }

    pub fn not_favorited(listing_id: impl Into<String>) -> Self {
        Self::new(listing_id, false)
    }
}

/// End state a write is expected to produce on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteTarget {
    Favorited,
    NotFavorited,
}

impl FavoriteTarget {
    pub fn is_favorite(self) -> bool {
        matches!(self, Self::Favorited)
    }

    pub fn matches(self, is_favorite: bool) -> bool {
        self.is_favorite() == is_favorite
    }
}

/// Kind of intent captured while signed out. Only adds are ever queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingActionKind {
    Add,
    #[serde(other)]
    Unknown,
}

/// Favorite intent recorded before sign-in and replayed once a session exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFavoriteAction {
    pub listing_id: String,
    pub action: PendingActionKind,
    /// Epoch milliseconds at capture time.
    pub timestamp: i64,
}

impl PendingFavoriteAction {
    pub fn add(listing_id: impl Into<String>) -> Self {
        Self {
            listing_id: listing_id.into(),
            action: PendingActionKind::Add,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Milliseconds elapsed since capture, clamped at zero for clock skew.
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.timestamp).max(0)
    }
}

/// A favorited listing as returned by the favorites list endpoint.
///
/// The backend has returned both full listing objects and thin favorite
/// records over time; only `id` is relied on, everything else is kept as is.
/// A typed field holding an unexpected type decodes as `None` so one odd
/// record never drops the whole list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub currency: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub make: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub year: Option<i32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Favorites of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserFavorites {
    pub favorites: Vec<Listing>,
    pub total: usize,
}

impl UserFavorites {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, listing_id: &str) -> bool {
        self.favorites
            .iter()
            .any(|listing| listing.id.as_deref() == Some(listing_id))
    }
}

/// Parses a listing id the way the backend addresses listings: a positive integer.
pub fn parse_listing_id(listing_id: &str) -> Option<u64> {
    listing_id.trim().parse::<u64>().ok().filter(|id| *id > 0)
}

fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    })
}

/// Accepts `T` directly or encoded in a string (`"2020"`, `"15000.00"`);
/// anything else reads as absent.
fn deserialize_lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if let Ok(parsed) = T::deserialize(&value) {
        return Ok(Some(parsed));
    }
    Ok(match &value {
        Value::String(text) => serde_json::from_str::<T>(text.trim()).ok(),
        _ => None,
    })
}
