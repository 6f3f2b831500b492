//! # Session Store
//!
//! Holds the signed-in session (if any) shared by every sub-client, and
//! publishes the current user on a `tokio::sync::watch` channel. The watch
//! channel is the process-wide "current user" observable: the signup wizard
//! subscribes to it to learn that a sign-in completed, instead of reading a
//! hidden global.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use zeroize::Zeroizing;

use circle_core::UserId;

/// An authenticated account as returned by the auth surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    /// Profile fields submitted at signup. The backend's new-user trigger
    /// copies these into the `profiles` row.
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A signed-in session.
///
/// Custom `Debug` implementation redacts the tokens.
#[derive(Clone, Deserialize)]
pub struct Session {
    pub access_token: Zeroizing<String>,
    #[serde(default)]
    pub refresh_token: Option<Zeroizing<String>>,
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("user", &self.user)
            .finish()
    }
}

/// Receiving side of the current-user observable.
pub type SessionWatch = watch::Receiver<Option<AuthUser>>;

/// Shared, observable session slot.
#[derive(Debug)]
pub struct SessionStore {
    current: RwLock<Option<Session>>,
    user_tx: watch::Sender<Option<AuthUser>>,
}

impl SessionStore {
    /// Create an empty store (nobody signed in).
    pub fn new() -> Arc<Self> {
        let (user_tx, _) = watch::channel(None);
        Arc::new(Self {
            current: RwLock::new(None),
            user_tx,
        })
    }

    /// Install a new session and notify observers.
    pub fn set(&self, session: Session) {
        let user = session.user.clone();
        *self.current.write() = Some(session);
        self.user_tx.send_replace(Some(user));
    }

    /// Drop the current session and notify observers.
    pub fn clear(&self) {
        *self.current.write() = None;
        self.user_tx.send_replace(None);
    }

    /// A copy of the current session, if any.
    pub fn session(&self) -> Option<Session> {
        self.current.read().clone()
    }

    /// The signed-in user's id, if any.
    pub fn user_id(&self) -> Option<UserId> {
        self.current.read().as_ref().map(|s| s.user.id)
    }

    /// The current access token, if any.
    pub fn access_token(&self) -> Option<Zeroizing<String>> {
        self.current.read().as_ref().map(|s| s.access_token.clone())
    }

    /// Subscribe to current-user changes.
    pub fn watch(&self) -> SessionWatch {
        self.user_tx.subscribe()
    }
}
