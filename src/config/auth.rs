//! Authentication header building for backend requests.
//!
//! Every request carries the project key in `apikey`; the bearer token is
//! the signed-in user's access token when there is one, the project key
//! otherwise.

use super::credentials::SecureString;

/// Header name and value for authentication.
pub type AuthHeader = (String, String);

/// Build the authentication headers for a request.
pub fn build_auth_headers(api_key: &SecureString, access_token: Option<&SecureString>) -> Vec<AuthHeader> {
    let bearer = access_token.unwrap_or(api_key);
    vec![
        ("apikey".to_string(), api_key.expose().to_string()),
        (
            "Authorization".to_string(),
            format!("Bearer {}", bearer.expose()),
        ),
    ]
}
