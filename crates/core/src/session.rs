//! Read-only view of the authentication session owned by the sign-in provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, user: SessionUser) -> Self {
        Self {
            access_token: Some(access_token.into()),
            user: Some(user),
            expires: None,
        }
    }

    /// Bearer token, if the session carries a non-empty one.
    pub fn token(&self) -> Option<&str> {
        self.access_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// A session can authorize favorites calls only with both a user and a token.
    pub fn is_usable(&self) -> bool {
        self.user.is_some() && self.token().is_some()
    }
}

/// Supplies the current session, or `None` when signed out.
pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;

    /// The current session if it can authorize API calls.
    fn usable_session(&self) -> Option<Session> {
        self.current_session().filter(Session::is_usable)
    }

    fn access_token(&self) -> Option<String> {
        self.usable_session()
            .and_then(|session| session.token().map(str::to_string))
    }
}

/// Session holder updated by whoever observes the sign-in provider.
#[derive(Debug, Default)]
pub struct SharedSession {
    inner: RwLock<Option<Session>>,
}

impl SharedSession {
    pub fn new(session: Option<Session>) -> Self {
        Self {
            inner: RwLock::new(session),
        }
    }

    pub fn set(&self, session: Session) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionProvider for SharedSession {
    fn current_session(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
