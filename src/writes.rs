//! Recipe writes: create, update and id allocation.

use std::sync::Arc;

use serde_json::Value;

use crate::backend::{value_key, Direction, RowStore, Selection};
use crate::config::CatalogSettings;
use crate::error::CatalogError;
use crate::model::{from_row, to_row, Recipe, RecipeDraft, RecipePatch};

/// Writes to the recipe collection.
#[derive(Clone)]
pub struct RecipeWriter {
    store: Arc<dyn RowStore>,
    table: String,
    id_field: String,
    max_attempts: u32,
}

impl RecipeWriter {
    pub fn new(store: Arc<dyn RowStore>, settings: &CatalogSettings) -> Self {
        Self {
            store,
            table: settings.recipes_table.clone(),
            id_field: settings.recipe_id_field.clone(),
            max_attempts: settings.max_create_retries.max(1),
        }
    }

    /// Insert one recipe and return the stored row.
    pub async fn create(&self, recipe: &Recipe) -> Result<Recipe, CatalogError> {
        let row = to_row(recipe, &self.table)?;
        let stored = self.store.insert(&self.table, row).await?;
        let stored: Recipe = from_row(stored, &self.table)?;
        tracing::info!(table = %self.table, id = %stored.id, "Recipe created");
        Ok(stored)
    }

    /// Apply `patch` to the recipe with `id` and return the updated row.
    ///
    /// Fails with a backend error when no row has that id.
    pub async fn update(&self, id: &str, patch: &RecipePatch) -> Result<Recipe, CatalogError> {
        let row = to_row(patch, &self.table)?;
        let stored = self.store.update(&self.table, &self.id_field, id, row).await?;
        let stored: Recipe = from_row(stored, &self.table)?;
        tracing::info!(table = %self.table, id = %id, fields = ?field_names(patch), "Recipe updated");
        Ok(stored)
    }

    /// Numeric value of the highest recipe id, or 0 when there is none.
    pub async fn last_id(&self) -> Result<u64, CatalogError> {
        let selection = Selection::all()
            .columns([self.id_field.clone()])
            .order(self.id_field.clone(), Direction::Descending)
            .limit(1);
        let rows = self.store.select(&self.table, &selection).await?;

        let last = rows
            .first()
            .and_then(|row| row.get(&self.id_field))
            .map(leading_integer)
            .unwrap_or(0);
        tracing::debug!(table = %self.table, last_id = last, "Read last recipe id");
        Ok(last)
    }

    /// Insert `draft` under the next free id.
    ///
    /// A unique-key conflict means another writer took the id first; the
    /// insert is retried with a larger id until the attempt limit. Any
    /// other error is returned as-is.
    pub async fn create_next(&self, draft: RecipeDraft) -> Result<Recipe, CatalogError> {
        let mut candidate = next_id(self.last_id().await?)?;
        let mut attempt = 1;

        loop {
            let recipe = Recipe::from_draft(candidate.to_string(), draft.clone());
            match self.create(&recipe).await {
                Ok(stored) => return Ok(stored),
                Err(e) if e.is_conflict() && attempt < self.max_attempts => {
                    tracing::warn!(
                        table = %self.table,
                        id = candidate,
                        attempt,
                        "Recipe id already taken, retrying"
                    );
                    candidate = next_id(self.last_id().await?)?.max(next_id(candidate)?);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// The id after `id`; the id space ends at `u64::MAX`.
fn next_id(id: u64) -> Result<u64, CatalogError> {
    id.checked_add(1)
        .ok_or_else(|| CatalogError::InvalidQuery(format!("no recipe id left after {}", id)))
}

/// Leading decimal digits of an id; 0 if there are none.
fn leading_integer(id: &Value) -> u64 {
    let Some(id) = value_key(id) else {
        return 0;
    };
    let digits: String = id.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

fn field_names(patch: &RecipePatch) -> Vec<&'static str> {
    let mut names = Vec::new();
    if patch.name.is_some() {
        names.push("strMeal");
    }
    if patch.instructions.is_some() {
        names.push("strInstructions");
    }
    if patch.ingredient_ids.is_some() {
        names.push("idIngredients");
    }
    names
}
