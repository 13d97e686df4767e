use serde::{Deserialize, Serialize};

use crate::config::SecureString;

/// Whether a user is currently signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// No session check has finished yet.
    #[default]
    Unknown,
    Authenticated,
    Unauthenticated,
}

impl AuthState {
    pub fn is_authenticated(self) -> bool {
        self == AuthState::Authenticated
    }
}

/// An account as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Tokens of a signed-in session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub access_token: SecureString,
    #[serde(default)]
    pub refresh_token: Option<SecureString>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Payload of a successful sign-in or sign-up.
///
/// Sign-up may return a user without a session when the account still
/// needs confirmation.
#[derive(Debug, Clone, Default)]
pub struct AuthResponse {
    pub user: Option<User>,
    pub session: Option<Session>,
}

impl AuthResponse {
    pub fn from_session(session: Session) -> Self {
        Self {
            user: Some(session.user.clone()),
            session: Some(session),
        }
    }
}
