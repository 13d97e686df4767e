//! Authentication state and session payloads.

mod state;
mod types;

pub use state::AuthStore;
pub use types::{AuthResponse, AuthState, Session, User};
