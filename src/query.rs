//! Declarative reads against a named collection.
//!
//! A [`QuerySpec`] names a collection, an optional equality filter and an
//! optional id set; [`QueryExecutor`] turns it into one backend read.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::backend::{RowStore, Selection};
use crate::bridge::Cold;
use crate::error::CatalogError;
use crate::model::{from_row, Row};

const DEFAULT_ID_FIELD: &str = "id";

/// What to read.
///
/// Filter pairs and the id set are ANDed. Null ids are dropped when the
/// set is built; an id set that ends up empty matches no rows.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    collection: String,
    filter: BTreeMap<String, Value>,
    ids: Option<Vec<String>>,
    id_field: String,
}

impl QuerySpec {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: BTreeMap::new(),
            ids: None,
            id_field: DEFAULT_ID_FIELD.to_string(),
        }
    }

    /// Require `column` to equal `value` exactly.
    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(column.into(), value.into());
        self
    }

    pub fn filters<I, K>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.filter
            .extend(pairs.into_iter().map(|(k, v)| (k.into(), v)));
        self
    }

    /// Restrict to rows whose id field is one of `ids`, skipping nulls.
    pub fn ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        let mut kept: Vec<String> = Vec::new();
        for id in ids.into_iter().flatten() {
            let id = id.into();
            if !kept.contains(&id) {
                kept.push(id);
            }
        }
        self.ids = Some(kept);
        self
    }

    /// Column matched against the id set (default `id`).
    pub fn id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// True when an id set was given and nothing survived null-stripping.
    pub fn matches_nothing(&self) -> bool {
        self.ids.as_ref().is_some_and(Vec::is_empty)
    }

    pub fn to_selection(&self) -> Selection {
        let mut selection = Selection::all();
        for (column, value) in &self.filter {
            selection = selection.eq(column.clone(), value.clone());
        }
        if let Some(ids) = &self.ids {
            selection = selection.within(self.id_field.clone(), ids.clone());
        }
        selection
    }
}

/// Issues [`QuerySpec`] reads against a row store.
#[derive(Clone)]
pub struct QueryExecutor {
    store: Arc<dyn RowStore>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn RowStore>) -> Self {
        Self { store }
    }

    /// Run the query and return every matching row.
    ///
    /// Backend errors are logged and returned as-is; there are no partial
    /// results.
    pub async fn execute(&self, spec: &QuerySpec) -> Result<Vec<Row>, CatalogError> {
        if spec.collection.trim().is_empty() {
            return Err(CatalogError::InvalidQuery(
                "collection name must not be empty".to_string(),
            ));
        }

        if spec.matches_nothing() {
            tracing::debug!(
                collection = %spec.collection,
                id_field = %spec.id_field,
                "Empty id set, skipping request"
            );
            return Ok(Vec::new());
        }

        tracing::debug!(
            collection = %spec.collection,
            filters = spec.filter.len(),
            ids = spec.ids.as_ref().map(Vec::len),
            "Querying collection"
        );

        match self.store.select(&spec.collection, &spec.to_selection()).await {
            Ok(rows) => {
                tracing::debug!(collection = %spec.collection, rows = rows.len(), "Query finished");
                Ok(rows)
            }
            Err(e) => {
                tracing::error!(
                    collection = %spec.collection,
                    error_type = e.error_type(),
                    error = %e,
                    "Error fetching data"
                );
                Err(e)
            }
        }
    }

    /// Run the query and decode every row as `T`.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        spec: &QuerySpec,
    ) -> Result<Vec<T>, CatalogError> {
        let rows = self.execute(spec).await?;
        rows.into_iter()
            .map(|row| from_row(row, &spec.collection))
            .collect()
    }

    /// The query as a cold sequence; each run issues a fresh request.
    pub fn observe(&self, spec: QuerySpec) -> Cold<Vec<Row>> {
        let executor = self.clone();
        let spec = Arc::new(spec);
        Cold::new(move || {
            let executor = executor.clone();
            let spec = Arc::clone(&spec);
            async move { executor.execute(&spec).await }
        })
    }

    pub fn observe_as<T>(&self, spec: QuerySpec) -> Cold<Vec<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let executor = self.clone();
        let spec = Arc::new(spec);
        Cold::new(move || {
            let executor = executor.clone();
            let spec = Arc::clone(&spec);
            async move { executor.execute_as(&spec).await }
        })
    }
}
