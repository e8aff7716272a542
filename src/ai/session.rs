//! Session Lookup
//!
//! Authentication lives outside the core. The core only asks, best-effort,
//! who is signed in (telemetry attribution) and which bearer token to present
//! to the relay.

use secrecy::SecretString;

use crate::types::UserId;

pub trait SessionProvider: Send + Sync {
    /// Current user, if a session is active
    fn user_id(&self) -> Option<UserId>;

    /// Bearer token for the relay endpoint
    fn access_token(&self) -> Option<SecretString> {
        None
    }
}

/// No signed-in user
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousSession;

impl SessionProvider for AnonymousSession {
    fn user_id(&self) -> Option<UserId> {
        None
    }
}

/// Fixed session, set once at startup
pub struct StaticSession {
    user_id: UserId,
    access_token: Option<SecretString>,
}

impl StaticSession {
    pub fn new(user_id: impl Into<UserId>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(token.into()));
        self
    }
}

impl std::fmt::Debug for StaticSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticSession")
            .field("user_id", &self.user_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SessionProvider for StaticSession {
    fn user_id(&self) -> Option<UserId> {
        Some(self.user_id.clone())
    }

    fn access_token(&self) -> Option<SecretString> {
        self.access_token.clone()
    }
}
