//! Error types shared by every catalog operation.
//!
//! Transport failures and backend-reported failures travel on the same
//! `Result`; callers tell them apart by variant.

use thiserror::Error;

use crate::config::ConfigError;

/// Postgres unique-violation code, reported by the row store on key conflicts.
pub const UNIQUE_VIOLATION: &str = "23505";

/// Row store code for "single row requested, zero or many found".
pub const SINGLE_ROW_MISMATCH: &str = "PGRST116";

/// Errors that can occur during catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a backend answer
    #[error("Request to '{endpoint}' failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The backend answered with an error
    #[error("Backend error {status}: {message}")]
    Backend {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// A row or payload did not match the expected shape
    #[error("Failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Rejected before any request was issued
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl CatalogError {
    pub fn backend(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        CatalogError::Backend {
            status,
            code: code.map(str::to_string),
            message: message.into(),
        }
    }

    /// Backend message for backend errors, the display string otherwise.
    pub fn message(&self) -> String {
        match self {
            CatalogError::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True when the backend rejected a write because the key already exists.
    pub fn is_conflict(&self) -> bool {
        match self {
            CatalogError::Backend { status, code, .. } => {
                *status == 409 || code.as_deref() == Some(UNIQUE_VIOLATION)
            }
            _ => false,
        }
    }

    /// True when a single-row read or write matched no row.
    pub fn is_not_found(&self) -> bool {
        match self {
            CatalogError::Backend { status, code, .. } => {
                *status == 404 || code.as_deref() == Some(SINGLE_ROW_MISMATCH)
            }
            _ => false,
        }
    }

    /// Error type string for logs.
    pub fn error_type(&self) -> &'static str {
        match self {
            CatalogError::Config(_) => "config_error",
            CatalogError::Client(_) => "client_error",
            CatalogError::Transport { .. } => "transport_error",
            CatalogError::Backend { .. } => "backend_error",
            CatalogError::Decode { .. } => "decode_error",
            CatalogError::InvalidQuery(_) => "invalid_query",
        }
    }
}
