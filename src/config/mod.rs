//! Configuration: backend connection, HTTP defaults, catalog settings and
//! logging.

mod auth;
mod credentials;
mod loader;
mod types;

pub use auth::{build_auth_headers, AuthHeader};
pub use credentials::{CredentialStatus, SecureString};
pub use loader::{ConfigError, KEY_ENV_VAR, LOG_ENV_VAR, URL_ENV_VAR};
pub use types::{BackendConfig, CatalogSettings, Config, Defaults, LoggingConfig};
