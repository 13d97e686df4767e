//! Process-wide authentication state.
//!
//! One [`AuthStore`] is built at startup and handed to every component
//! that needs it. The state is never edited directly: it is recomputed
//! from the backend session after every login, logout and registration,
//! and subscribers always see the latest value.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{watch, Mutex};

use crate::auth::types::{AuthResponse, AuthState};
use crate::backend::AuthService;
use crate::error::CatalogError;

/// Shared, observable authentication state.
///
/// Cloning is cheap; clones share the same state cell.
#[derive(Clone)]
pub struct AuthStore {
    inner: Arc<AuthStoreInner>,
}

struct AuthStoreInner {
    service: Arc<dyn AuthService>,
    state: watch::Sender<AuthState>,
    /// Serializes session checks so publish order matches check order.
    refresh_lock: Mutex<()>,
}

impl AuthStore {
    /// Create a store in the `Unknown` state without contacting the backend.
    pub fn new(service: Arc<dyn AuthService>) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            inner: Arc::new(AuthStoreInner {
                service,
                state,
                refresh_lock: Mutex::new(()),
            }),
        }
    }

    /// Create a store and run the startup session check.
    pub async fn connect(service: Arc<dyn AuthService>) -> Self {
        let store = Self::new(service);
        store.refresh().await;
        store
    }

    /// Latest published state.
    pub fn current(&self) -> AuthState {
        *self.inner.state.borrow()
    }

    /// Receiver holding the latest state and notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// The current state followed by every later change.
    pub fn changes(&self) -> BoxStream<'static, AuthState> {
        let rx = self.subscribe();
        stream::unfold((rx, true), |(mut rx, first)| async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let state = *rx.borrow_and_update();
            Some((state, (rx, false)))
        })
        .boxed()
    }

    /// Ask the backend for the current session and publish the result.
    ///
    /// A failed check counts as signed out.
    pub async fn refresh(&self) -> AuthState {
        let _guard = self.inner.refresh_lock.lock().await;

        let next = match self.inner.service.current_user().await {
            Ok(Some(user)) => {
                tracing::debug!(user_id = %user.id, "Session check: signed in");
                AuthState::Authenticated
            }
            Ok(None) => {
                tracing::debug!("Session check: no session");
                AuthState::Unauthenticated
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session check failed, treating as signed out");
                AuthState::Unauthenticated
            }
        };

        self.publish(next);
        next
    }

    /// Sign in with email and password, then refresh the state.
    ///
    /// The refresh runs whether or not the sign-in succeeded.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, CatalogError> {
        let result = self.inner.service.sign_in_with_password(email, password).await;
        match &result {
            Ok(_) => tracing::info!(email = %email, "Signed in"),
            Err(e) => tracing::warn!(email = %email, error = %e, "Sign-in failed"),
        }
        self.refresh().await;
        result
    }

    /// End the session, then refresh the state.
    pub async fn logout(&self) -> Result<bool, CatalogError> {
        let result = self.inner.service.sign_out().await;
        match &result {
            Ok(()) => tracing::info!("Signed out"),
            Err(e) => tracing::warn!(error = %e, "Sign-out failed"),
        }
        self.refresh().await;
        result.map(|()| true)
    }

    /// Create an account, then refresh the state.
    pub async fn register(&self, email: &str, password: &str) -> Result<AuthResponse, CatalogError> {
        let result = self.inner.service.sign_up(email, password).await;
        match &result {
            Ok(resp) => tracing::info!(
                email = %email,
                has_session = resp.session.is_some(),
                "Registered"
            ),
            Err(e) => tracing::warn!(email = %email, error = %e, "Registration failed"),
        }
        self.refresh().await;
        result
    }

    fn publish(&self, next: AuthState) {
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            tracing::info!(state = ?next, "Authentication state changed");
        }
    }
}
