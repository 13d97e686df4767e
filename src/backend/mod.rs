//! Backend contract: row store, authentication service and object store.
//!
//! The catalog only talks to the backend through these traits.
//! [`RestBackend`] speaks the hosted REST dialect over HTTP;
//! [`MemoryBackend`] keeps everything in process.

mod memory;
mod rest;
mod rest_auth;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::auth::{AuthResponse, User};
use crate::error::CatalogError;
use crate::model::Row;

pub use memory::MemoryBackend;
pub use rest::RestBackend;

/// Sort direction for [`Selection::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A read against one table.
///
/// Every part is optional; an empty selection returns every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Columns to return; empty means all.
    pub columns: Vec<String>,
    /// Column equals value, ANDed.
    pub eq: Vec<(String, Value)>,
    /// Column value is one of the ids.
    pub within: Option<(String, Vec<String>)>,
    pub order: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.eq.push((column.into(), value));
        self
    }

    pub fn within(mut self, column: impl Into<String>, ids: Vec<String>) -> Self {
        self.within = Some((column.into(), ids));
        self
    }

    pub fn order(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Table storage.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Read all rows matching `selection`.
    async fn select(&self, table: &str, selection: &Selection) -> Result<Vec<Row>, CatalogError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, CatalogError>;

    /// Update the single row whose `key_column` equals `key` and return it.
    ///
    /// Matching zero rows is an error.
    async fn update(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        patch: Row,
    ) -> Result<Row, CatalogError>;
}

/// Account and session management.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, CatalogError>;

    async fn sign_out(&self) -> Result<(), CatalogError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, CatalogError>;

    /// The user behind the current session, `None` when signed out.
    async fn current_user(&self) -> Result<Option<User>, CatalogError>;
}

/// Binary object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Download the object at `path`, a free-form `/`-separated key.
    ///
    /// `cache_token` is sent as the `rand` query parameter so no cache
    /// along the way can answer with stale bytes.
    async fn download(
        &self,
        bucket: &str,
        path: &str,
        cache_token: Option<&str>,
    ) -> Result<Bytes, CatalogError>;
}

/// Key form of a cell value used for id matching and ordering.
pub(crate) fn value_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
