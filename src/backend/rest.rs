//! HTTP backend speaking the hosted REST dialect.
//!
//! Rows go through `/rest/v1`, objects through `/storage/v1/object` and
//! accounts through `/auth/v1` (see `rest_auth.rs`).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{Direction, ObjectStore, RowStore, Selection};
use crate::auth::Session;
use crate::config::{build_auth_headers, Config, ConfigError, CredentialStatus, SecureString};
use crate::error::CatalogError;
use crate::model::Row;

/// Accept header value asking the row store for exactly one object.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

/// HTTP client for the hosted backend.
///
/// Holds the signed-in session, if any; clones share it.
#[derive(Clone)]
pub struct RestBackend {
    pub(super) client: Client,
    pub(super) base_url: String,
    pub(super) api_key: SecureString,
    pub(super) session: Arc<RwLock<Option<Session>>>,
}

impl RestBackend {
    pub fn new(config: &Config) -> Result<Self, CatalogError> {
        let api_key = match config.backend.resolve_credential() {
            CredentialStatus::Configured(key) => key,
            CredentialStatus::Unconfigured { reason } => {
                return Err(ConfigError::ValidationError { message: reason }.into())
            }
        };

        let mut builder =
            Client::builder().pool_max_idle_per_host(config.defaults.pool_max_idle_per_host);
        if let Some(secs) = config.defaults.connect_timeout_seconds {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.defaults.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(CatalogError::Client)?;

        Ok(Self {
            client,
            base_url: config.backend.url.trim().trim_end_matches('/').to_string(),
            api_key,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// The session tokens currently held, if signed in.
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    pub(super) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn parse_url(&self, path: &str) -> Result<Url, CatalogError> {
        let endpoint = self.endpoint(path);
        Url::parse(&endpoint)
            .map_err(|e| CatalogError::InvalidQuery(format!("bad url '{}': {}", endpoint, e)))
    }

    pub(super) fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        let session = self.session.read();
        let token = session.as_ref().map(|s| &s.access_token);
        build_auth_headers(&self.api_key, token)
            .into_iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value))
    }

    /// Send an authorized request; non-2xx answers become backend errors.
    pub(super) async fn send(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<Response, CatalogError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|source| CatalogError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(read_error(response).await)
        }
    }
}

pub(super) async fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    response: Response,
) -> Result<T, CatalogError> {
    let body = read_bytes(endpoint, response).await?;
    serde_json::from_slice(&body).map_err(|source| CatalogError::Decode {
        what: format!("response from '{}'", endpoint),
        source,
    })
}

async fn read_bytes(endpoint: &str, response: Response) -> Result<Bytes, CatalogError> {
    response
        .bytes()
        .await
        .map_err(|source| CatalogError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })
}

/// Turn an error response into a backend error.
///
/// The three services report errors with different field names.
pub(super) async fn read_error(response: Response) -> CatalogError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let json: Option<Value> = serde_json::from_str(&body).ok();

    let text_field = |names: &[&str]| {
        json.as_ref().and_then(|v| {
            names
                .iter()
                .find_map(|name| v.get(*name).and_then(Value::as_str).map(str::to_string))
        })
    };

    let message = text_field(&["message", "msg", "error_description", "error"])
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

    let code = text_field(&["code", "error_code"]).or_else(|| {
        json.as_ref()
            .and_then(|v| v.get("code"))
            .and_then(Value::as_u64)
            .map(|c| c.to_string())
    });

    CatalogError::Backend {
        status: status.as_u16(),
        code,
        message,
    }
}

/// Right-hand side of an `eq` filter.
fn eq_operand(value: &Value) -> String {
    match value {
        Value::Null => "is.null".to_string(),
        Value::String(s) => format!("eq.{}", s),
        other => format!("eq.{}", other),
    }
}

/// Right-hand side of an `in` filter, every id quoted.
fn in_operand(ids: &[String]) -> String {
    let quoted: Vec<String> = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

fn selection_url(mut url: Url, selection: &Selection) -> Url {
    {
        let mut pairs = url.query_pairs_mut();
        let columns = if selection.columns.is_empty() {
            "*".to_string()
        } else {
            selection.columns.join(",")
        };
        pairs.append_pair("select", &columns);

        for (column, value) in &selection.eq {
            pairs.append_pair(column, &eq_operand(value));
        }
        if let Some((column, ids)) = &selection.within {
            pairs.append_pair(column, &in_operand(ids));
        }
        if let Some((column, direction)) = &selection.order {
            let dir = match direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            pairs.append_pair("order", &format!("{}.{}", column, dir));
        }
        if let Some(limit) = selection.limit {
            pairs.append_pair("limit", &limit.to_string());
        }
    }
    url
}

/// Object URL with every path segment percent-encoded, so `#`, `?` and
/// spaces in an object key stay part of the path.
fn object_url(
    mut url: Url,
    bucket: &str,
    path: &str,
    cache_token: Option<&str>,
) -> Result<Url, CatalogError> {
    url.path_segments_mut()
        .map_err(|_| CatalogError::InvalidQuery("object base url cannot hold a path".to_string()))?
        .pop_if_empty()
        .push(bucket)
        .extend(path.trim_start_matches('/').split('/'));
    if let Some(token) = cache_token {
        url.query_pairs_mut().append_pair("rand", token);
    }
    Ok(url)
}

#[async_trait]
impl RowStore for RestBackend {
    async fn select(&self, table: &str, selection: &Selection) -> Result<Vec<Row>, CatalogError> {
        let url = selection_url(self.parse_url(&format!("/rest/v1/{}", table))?, selection);
        let endpoint = url.to_string();
        let response = self.send(&endpoint, self.client.get(url)).await?;
        read_json(&endpoint, response).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, CatalogError> {
        let endpoint = self.endpoint(&format!("/rest/v1/{}", table));
        let builder = self
            .client
            .post(&endpoint)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(&[row]);
        let response = self.send(&endpoint, builder).await?;
        read_json(&endpoint, response).await
    }

    async fn update(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        patch: Row,
    ) -> Result<Row, CatalogError> {
        let mut url = self.parse_url(&format!("/rest/v1/{}", table))?;
        url.query_pairs_mut()
            .append_pair(key_column, &format!("eq.{}", key));
        let endpoint = url.to_string();
        let builder = self
            .client
            .patch(url)
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .header(CONTENT_TYPE, "application/json")
            .json(&patch);
        let response = self.send(&endpoint, builder).await?;
        read_json(&endpoint, response).await
    }
}

#[async_trait]
impl ObjectStore for RestBackend {
    async fn download(
        &self,
        bucket: &str,
        path: &str,
        cache_token: Option<&str>,
    ) -> Result<Bytes, CatalogError> {
        let url = object_url(self.parse_url("/storage/v1/object")?, bucket, path, cache_token)?;
        let endpoint = url.to_string();
        let response = self.send(&endpoint, self.client.get(url)).await?;
        read_bytes(&endpoint, response).await
    }
}
