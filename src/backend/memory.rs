//! In-process backend.
//!
//! Implements the whole backend contract over plain collections so the
//! catalog can run offline and be exercised without a server. It mirrors
//! the hosted backend's observable behavior: primary-key conflicts,
//! single-row update errors and session-scoped users.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

use super::{value_key, AuthService, Direction, ObjectStore, RowStore, Selection};
use crate::auth::{AuthResponse, Session, User};
use crate::config::{CatalogSettings, SecureString};
use crate::error::{CatalogError, SINGLE_ROW_MISMATCH, UNIQUE_VIOLATION};
use crate::model::Row;

const DEFAULT_PRIMARY_KEY: &str = "id";
const MIN_PASSWORD_LEN: usize = 6;

/// Backend held entirely in memory. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<String, Vec<Row>>,
    primary_keys: HashMap<String, String>,
    users: HashMap<String, StoredUser>,
    session: Option<Session>,
    objects: HashMap<(String, String), Bytes>,
}

struct StoredUser {
    user: User,
    password: String,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend with the recipe and ingredient primary keys from `settings`.
    pub fn for_catalog(settings: &CatalogSettings) -> Self {
        Self::new()
            .with_primary_key(&settings.recipes_table, &settings.recipe_id_field)
            .with_primary_key(&settings.ingredients_table, &settings.ingredient_id_field)
    }

    /// Declare the unique key column of `table` (default `id`).
    pub fn with_primary_key(self, table: &str, column: &str) -> Self {
        self.inner
            .lock()
            .primary_keys
            .insert(table.to_string(), column.to_string());
        self
    }

    /// Append rows to `table` without constraint checks.
    ///
    /// Non-object values are skipped.
    pub fn seed<I>(&self, table: &str, rows: I)
    where
        I: IntoIterator<Item = Value>,
    {
        let mut state = self.inner.lock();
        let stored = state.tables.entry(table.to_string()).or_default();
        stored.extend(rows.into_iter().filter_map(|row| match row {
            Value::Object(row) => Some(row),
            _ => None,
        }));
    }

    /// Snapshot of every row in `table`.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.inner.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Register a confirmed account.
    pub fn add_user(&self, email: &str, password: &str) -> User {
        let mut state = self.inner.lock();
        state.create_user(email, password)
    }

    pub fn put_object(&self, bucket: &str, path: &str, bytes: impl Into<Bytes>) {
        self.inner
            .lock()
            .objects
            .insert((bucket.to_string(), path.to_string()), bytes.into());
    }
}

impl MemoryState {
    fn primary_key(&self, table: &str) -> &str {
        self.primary_keys
            .get(table)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    fn create_user(&mut self, email: &str, password: &str) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            role: Some("authenticated".to_string()),
        };
        self.users.insert(
            email.to_string(),
            StoredUser {
                user: user.clone(),
                password: password.to_string(),
            },
        );
        user
    }

    fn open_session(&mut self, user: User) -> Session {
        let session = Session {
            access_token: SecureString::new(Uuid::new_v4().simple().to_string()),
            refresh_token: Some(SecureString::new(Uuid::new_v4().simple().to_string())),
            token_type: "bearer".to_string(),
            expires_in: Some(3600),
            user,
        };
        self.session = Some(session.clone());
        session
    }
}

fn matches(row: &Row, selection: &Selection) -> bool {
    let eq_ok = selection
        .eq
        .iter()
        .all(|(column, value)| row.get(column) == Some(value));

    let within_ok = match &selection.within {
        Some((column, ids)) => row
            .get(column)
            .and_then(value_key)
            .is_some_and(|key| ids.contains(&key)),
        None => true,
    };

    eq_ok && within_ok
}

/// Sort key of a cell: numeric ids first in numeric order, then other ids
/// as text, then nulls.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Number(u64),
    Text(String),
    Null,
}

impl SortKey {
    fn of(value: Option<&Value>) -> Self {
        match value.and_then(value_key) {
            Some(key) => match key.parse::<u64>() {
                Ok(n) => SortKey::Number(n),
                Err(_) => SortKey::Text(key),
            },
            None => SortKey::Null,
        }
    }
}

fn project(row: &Row, columns: &[String]) -> Row {
    if columns.is_empty() {
        return row.clone();
    }
    columns
        .iter()
        .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
        .collect()
}

fn duplicate_key(table: &str) -> CatalogError {
    CatalogError::backend(
        409,
        Some(UNIQUE_VIOLATION),
        format!("duplicate key value violates unique constraint \"{}_pkey\"", table),
    )
}

#[async_trait]
impl RowStore for MemoryBackend {
    async fn select(&self, table: &str, selection: &Selection) -> Result<Vec<Row>, CatalogError> {
        let state = self.inner.lock();
        let Some(rows) = state.tables.get(table) else {
            return Ok(Vec::new());
        };

        let mut found: Vec<&Row> = rows.iter().filter(|row| matches(row, selection)).collect();

        if let Some((column, direction)) = &selection.order {
            found.sort_by_cached_key(|row| SortKey::of(row.get(column)));
            if *direction == Direction::Descending {
                found.reverse();
            }
        }

        let limit = selection.limit.unwrap_or(usize::MAX);
        Ok(found
            .into_iter()
            .take(limit)
            .map(|row| project(row, &selection.columns))
            .collect())
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, CatalogError> {
        let mut state = self.inner.lock();
        let key_column = state.primary_key(table).to_string();
        let rows = state.tables.entry(table.to_string()).or_default();

        if let Some(key) = row.get(&key_column).and_then(value_key) {
            let taken = rows
                .iter()
                .any(|existing| existing.get(&key_column).and_then(value_key) == Some(key.clone()));
            if taken {
                return Err(duplicate_key(table));
            }
        }

        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
        patch: Row,
    ) -> Result<Row, CatalogError> {
        let mut state = self.inner.lock();
        let primary_key = state.primary_key(table).to_string();
        let rows = state.tables.entry(table.to_string()).or_default();

        let hits: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.get(key_column).and_then(value_key).as_deref() == Some(key))
            .map(|(i, _)| i)
            .collect();

        let [index] = hits[..] else {
            return Err(CatalogError::backend(
                406,
                Some(SINGLE_ROW_MISMATCH),
                "JSON object requested, multiple (or no) rows returned",
            ));
        };

        if let Some(new_key) = patch.get(&primary_key).and_then(value_key) {
            let others: HashSet<String> = rows
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != index)
                .filter_map(|(_, row)| row.get(&primary_key).and_then(value_key))
                .collect();
            if others.contains(&new_key) {
                return Err(duplicate_key(table));
            }
        }

        let row = &mut rows[index];
        for (column, value) in patch {
            row.insert(column, value);
        }
        Ok(row.clone())
    }
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, CatalogError> {
        let mut state = self.inner.lock();
        let user = match state.users.get(email) {
            Some(stored) if stored.password == password => stored.user.clone(),
            _ => {
                return Err(CatalogError::backend(
                    400,
                    Some("invalid_credentials"),
                    "Invalid login credentials",
                ))
            }
        };
        Ok(AuthResponse::from_session(state.open_session(user)))
    }

    async fn sign_out(&self) -> Result<(), CatalogError> {
        self.inner.lock().session = None;
        Ok(())
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<AuthResponse, CatalogError> {
        let mut state = self.inner.lock();
        if state.users.contains_key(email) {
            return Err(CatalogError::backend(
                422,
                Some("user_already_exists"),
                "User already registered",
            ));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(CatalogError::backend(
                422,
                Some("weak_password"),
                format!("Password should be at least {} characters.", MIN_PASSWORD_LEN),
            ));
        }
        let user = state.create_user(email, password);
        Ok(AuthResponse::from_session(state.open_session(user)))
    }

    async fn current_user(&self) -> Result<Option<User>, CatalogError> {
        Ok(self.inner.lock().session.as_ref().map(|s| s.user.clone()))
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn download(
        &self,
        bucket: &str,
        path: &str,
        _cache_token: Option<&str>,
    ) -> Result<Bytes, CatalogError> {
        self.inner
            .lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| CatalogError::backend(404, Some("not_found"), "Object not found"))
    }
}
