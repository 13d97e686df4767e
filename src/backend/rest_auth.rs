//! Account endpoints of [`RestBackend`].

use async_trait::async_trait;
use serde_json::{json, Value};

use super::rest::{read_json, RestBackend};
use super::AuthService;
use crate::auth::{AuthResponse, Session, User};
use crate::error::CatalogError;

impl RestBackend {
    fn store_session(&self, session: Option<Session>) {
        *self.session.write() = session;
    }

    fn has_session(&self) -> bool {
        self.session.read().is_some()
    }
}

/// Sign-up answers with a full session when the account is confirmed
/// immediately, otherwise with the bare user.
fn parse_sign_up(endpoint: &str, body: Value) -> Result<AuthResponse, CatalogError> {
    let decode = |source| CatalogError::Decode {
        what: format!("response from '{}'", endpoint),
        source,
    };

    if body.get("access_token").is_some() {
        let session: Session = serde_json::from_value(body).map_err(decode)?;
        return Ok(AuthResponse::from_session(session));
    }

    let user_value = body.get("user").cloned().unwrap_or(body);
    let user: User = serde_json::from_value(user_value).map_err(decode)?;
    Ok(AuthResponse {
        user: Some(user),
        session: None,
    })
}

#[async_trait]
impl AuthService for RestBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, CatalogError> {
        let endpoint = self.endpoint("/auth/v1/token?grant_type=password");
        let builder = self
            .client
            .post(&endpoint)
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(&endpoint, builder).await?;
        let session: Session = read_json(&endpoint, response).await?;

        self.store_session(Some(session.clone()));
        Ok(AuthResponse::from_session(session))
    }

    async fn sign_out(&self) -> Result<(), CatalogError> {
        if !self.has_session() {
            return Ok(());
        }

        let endpoint = self.endpoint("/auth/v1/logout");
        let result = self.send(&endpoint, self.client.post(&endpoint)).await;
        // The local session is gone whatever the server says.
        self.store_session(None);

        match result {
            Ok(_) => Ok(()),
            Err(CatalogError::Backend { status, .. }) if matches!(status, 401 | 403 | 404) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, CatalogError> {
        let endpoint = self.endpoint("/auth/v1/signup");
        let builder = self
            .client
            .post(&endpoint)
            .json(&json!({ "email": email, "password": password }));
        let response = self.send(&endpoint, builder).await?;
        let body: Value = read_json(&endpoint, response).await?;

        let resp = parse_sign_up(&endpoint, body)?;
        if resp.session.is_some() {
            self.store_session(resp.session.clone());
        }
        Ok(resp)
    }

    async fn current_user(&self) -> Result<Option<User>, CatalogError> {
        if !self.has_session() {
            return Ok(None);
        }

        let endpoint = self.endpoint("/auth/v1/user");
        match self.send(&endpoint, self.client.get(&endpoint)).await {
            Ok(response) => read_json(&endpoint, response).await.map(Some),
            Err(CatalogError::Backend { status, .. }) if matches!(status, 401 | 403) => {
                tracing::debug!(status, "Stored session rejected, dropping it");
                self.store_session(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
