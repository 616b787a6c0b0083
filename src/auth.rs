//! Bearer token holder shared by the HTTP clients

use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoggedIn,
    /// Token cleared; `forced` when triggered by a 401 from the backend
    LoggedOut { forced: bool },
}

pub struct AuthSession {
    token: RwLock<Option<String>>,
    events: broadcast::Sender<AuthEvent>,
}

impl AuthSession {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            token: RwLock::new(None),
            events,
        }
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        session.set_token(token);
        session
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.replace(Some(token.into()));
        let _ = self.events.send(AuthEvent::LoggedIn);
    }

    pub fn logout(&self) {
        self.replace(None);
        info!("Logged out");
        let _ = self.events.send(AuthEvent::LoggedOut { forced: false });
    }

    /// Clear the token after the backend rejected it
    pub fn force_logout(&self) {
        self.replace(None);
        warn!("Backend rejected credentials, forcing logout");
        let _ = self.events.send(AuthEvent::LoggedOut { forced: true });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Attach the bearer token, when present
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn replace(&self, value: Option<String>) {
        match self.token.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

impl Default for AuthSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_logout_clears_token_and_notifies() {
        let auth = AuthSession::with_token("abc");
        let mut events = auth.subscribe();
        assert!(auth.is_authenticated());

        auth.force_logout();
        assert!(!auth.is_authenticated());
        assert_eq!(events.try_recv().ok(), Some(AuthEvent::LoggedOut { forced: true }));
    }
}
