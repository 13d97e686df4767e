//! Credential resolution from configuration.
//!
//! This module provides secure handling of API keys and session tokens
//! so they never end up in logs.

use serde::{Deserialize, Serialize};

use super::types::BackendConfig;

/// Wrapper for sensitive strings that prevents accidental logging.
///
/// The inner value is never exposed via Debug or Display traits.
/// Use `expose()` to access the actual value when needed for API calls.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecureString(String);

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: String) -> Self {
        Self(value)
    }

    /// Expose the inner value.
    ///
    /// Use sparingly and only when actually sending to APIs.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(••••••••)")
    }
}

impl std::fmt::Display for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "••••••••")
    }
}

/// Status of credential resolution for the backend.
#[derive(Debug, Clone)]
pub enum CredentialStatus {
    /// API key resolved successfully.
    Configured(SecureString),
    /// API key is missing or empty.
    Unconfigured {
        /// Reason for missing configuration.
        reason: String,
    },
}

impl BackendConfig {
    /// Resolve the API key.
    pub fn resolve_credential(&self) -> CredentialStatus {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => {
                CredentialStatus::Configured(SecureString::new(key.to_string()))
            }
            _ => CredentialStatus::Unconfigured {
                reason: "api_key is not set".to_string(),
            },
        }
    }

    /// Check if the backend has a usable API key.
    pub fn is_configured(&self) -> bool {
        matches!(self.resolve_credential(), CredentialStatus::Configured(_))
    }
}
