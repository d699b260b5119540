//! Auth session identity.
//!
//! Token issuance and verification live with the external auth provider;
//! this module only tracks *who* the current user is and notifies
//! subscribers on identity transitions. A token refresh that keeps the same
//! user id is not a transition and must not be observable downstream (the
//! cart would otherwise reload on every refresh).

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

/// Profile record supplied by the auth provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
}

impl AuthUser {
    /// Identity known only by id, e.g. a bearer subject asserted by the auth
    /// layer in front of the HTTP service. Profile fields stay empty.
    pub fn from_id(id: Uuid) -> Self {
        Self {
            id,
            email: String::new(),
            full_name: String::new(),
            avatar_url: None,
        }
    }
}

/// Current identity plus a subscribe/notify channel for its transitions.
///
/// `None` is the anonymous state. Subscribers receive a notification on
/// sign-in, sign-out and user switch; a same-user refresh updates the stored
/// profile silently.
pub struct AuthSession {
    tx: watch::Sender<Option<AuthUser>>,
}

impl AuthSession {
    /// Start anonymous.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn current(&self) -> Option<AuthUser> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.tx.subscribe()
    }

    /// Record a sign-in or a profile refresh. Profile fields always update;
    /// subscribers are only notified when the user id actually changed.
    pub fn set_identity(&self, user: AuthUser) {
        self.tx.send_if_modified(|current| {
            let changed = current.as_ref().map(|u| u.id) != Some(user.id);
            *current = Some(user);
            changed
        });
    }

    pub fn sign_out(&self) {
        self.tx.send_if_modified(|current| {
            let changed = current.is_some();
            *current = None;
            changed
        });
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn user(name: &str) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: format!("{}@zentaro.example", name.to_lowercase()),
            full_name: name.to_string(),
            avatar_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::user;
    use super::*;

    #[test]
    fn test_transitions_notify() {
        let session = AuthSession::new();
        let mut rx = session.subscribe();

        session.set_identity(user("Asuma"));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        // Switching users notifies again
        session.set_identity(user("Kurenai"));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        session.sign_out();
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        assert!(session.current().is_none());
    }

    #[test]
    fn test_same_user_refresh_is_silent() {
        let session = AuthSession::new();
        let original = user("Asuma");
        session.set_identity(original.clone());

        let mut rx = session.subscribe();
        let mut refreshed = original.clone();
        refreshed.avatar_url = Some("https://img.example/asuma.png".to_string());
        session.set_identity(refreshed.clone());

        assert!(!rx.has_changed().unwrap());
        // The stored profile still picked up the newer fields
        assert_eq!(session.current(), Some(refreshed));
    }

    #[test]
    fn test_sign_out_when_anonymous_is_silent() {
        let session = AuthSession::new();
        let mut rx = session.subscribe();
        session.sign_out();
        assert!(!rx.has_changed().unwrap());
    }
}
