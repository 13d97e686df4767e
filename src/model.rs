//! Recipe and ingredient records as stored by the backend.
//!
//! Field names follow the backend columns (`idMeal`, `strMeal`, ...);
//! columns this crate does not know about are kept in `extra`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::CatalogError;
use crate::images::ImageHandle;

/// A backend row.
pub type Row = Map<String, Value>;

/// A stored recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    #[serde(rename = "idMeal", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "strMeal", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "strInstructions", default, deserialize_with = "null_as_default")]
    pub instructions: String,
    /// Ordered ingredient references; `None` is an unfilled slot.
    #[serde(rename = "idIngredients", default, deserialize_with = "null_as_default")]
    pub ingredient_ids: Vec<Option<String>>,
    #[serde(flatten)]
    pub extra: Row,
}

/// A recipe that has not been assigned an id yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeDraft {
    pub name: String,
    pub instructions: String,
    pub ingredient_ids: Vec<Option<String>>,
}

impl Recipe {
    pub fn from_draft(id: impl Into<String>, draft: RecipeDraft) -> Self {
        Self {
            id: id.into(),
            name: draft.name,
            instructions: draft.instructions,
            ingredient_ids: draft.ingredient_ids,
            extra: Row::new(),
        }
    }

    /// Non-null ingredient references, in recipe order.
    pub fn filled_ingredient_ids(&self) -> impl Iterator<Item = &str> {
        self.ingredient_ids.iter().filter_map(|id| id.as_deref())
    }
}

/// Partial update of a recipe. Fields left as `None` are not sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipePatch {
    #[serde(rename = "strMeal", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "strInstructions", skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(rename = "idIngredients", skip_serializing_if = "Option::is_none")]
    pub ingredient_ids: Option<Vec<Option<String>>>,
}

impl RecipePatch {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn ingredient_ids(mut self, ids: Vec<Option<String>>) -> Self {
        self.ingredient_ids = Some(ids);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.instructions.is_none() && self.ingredient_ids.is_none()
    }
}

/// A stored ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "idIngredient", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "strIngredient", default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Object path of the ingredient image inside the image bucket.
    #[serde(rename = "strStorageimg", default)]
    pub image_path: Option<String>,
    #[serde(flatten)]
    pub extra: Row,
}

/// An ingredient together with its downloaded image, if the download worked.
///
/// The handle is owned by whoever holds this value; dropping the value or
/// calling [`EnrichedIngredient::dispose`] releases the image bytes.
#[derive(Debug)]
pub struct EnrichedIngredient {
    pub ingredient: Ingredient,
    pub image: Option<ImageHandle>,
}

impl EnrichedIngredient {
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Release the image and keep the plain record.
    pub fn dispose(self) -> Ingredient {
        if let Some(handle) = self.image {
            handle.dispose();
        }
        self.ingredient
    }
}

/// Serialize a model into a row.
pub fn to_row<T: Serialize>(value: &T, what: &str) -> Result<Row, CatalogError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(row)) => Ok(row),
        Ok(other) => Err(CatalogError::Decode {
            what: what.to_string(),
            source: serde::ser::Error::custom(format!("expected an object, got {}", other)),
        }),
        Err(source) => Err(CatalogError::Decode {
            what: what.to_string(),
            source,
        }),
    }
}

/// Deserialize a row into a model.
pub fn from_row<T: serde::de::DeserializeOwned>(row: Row, what: &str) -> Result<T, CatalogError> {
    serde_json::from_value(Value::Object(row)).map_err(|source| CatalogError::Decode {
        what: what.to_string(),
        source,
    })
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number id, got {}",
            other
        ))),
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
