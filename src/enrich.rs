//! Ingredient lookup with image download.
//!
//! One query fetches the ingredient rows; each row then downloads its
//! image concurrently with the others. Records are emitted as their
//! downloads finish, in no particular order. A failed download only costs
//! that record its image.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use uuid::Uuid;

use crate::backend::ObjectStore;
use crate::config::CatalogSettings;
use crate::error::CatalogError;
use crate::images::ImageRegistry;
use crate::model::{from_row, EnrichedIngredient, Ingredient, Row};
use crate::query::{QueryExecutor, QuerySpec};

/// Resolves ingredient ids into records carrying local image handles.
#[derive(Clone)]
pub struct IngredientEnricher {
    executor: QueryExecutor,
    objects: Arc<dyn ObjectStore>,
    images: ImageRegistry,
    table: String,
    id_field: String,
    bucket: String,
    concurrency: usize,
}

impl IngredientEnricher {
    pub fn new(
        executor: QueryExecutor,
        objects: Arc<dyn ObjectStore>,
        images: ImageRegistry,
        settings: &CatalogSettings,
    ) -> Self {
        Self {
            executor,
            objects,
            images,
            table: settings.ingredients_table.clone(),
            id_field: settings.ingredient_id_field.clone(),
            bucket: settings.image_bucket.clone(),
            concurrency: settings.image_fetch_concurrency.max(1),
        }
    }

    /// Look up `ids` (nulls ignored) and download each ingredient's image.
    ///
    /// The stream is lazy and runs from scratch each time it is built. A
    /// failed lookup yields one `Err` and ends the stream; a row that does
    /// not decode yields an `Err` in its place. Each id is emitted at most
    /// once.
    pub fn enrich(
        &self,
        ids: Vec<Option<String>>,
    ) -> BoxStream<'static, Result<EnrichedIngredient, CatalogError>> {
        let spec = QuerySpec::new(self.table.clone())
            .ids(ids)
            .id_field(self.id_field.clone());
        let table = self.table.clone();
        let objects = Arc::clone(&self.objects);
        let images = self.images.clone();
        let bucket = self.bucket.clone();
        let mut seen = HashSet::new();

        self.executor
            .observe(spec)
            .stream()
            .map_ok(|rows| stream::iter(rows.into_iter().map(Ok::<Row, CatalogError>)))
            .try_flatten()
            .and_then(move |row| future::ready(from_row::<Ingredient>(row, &table)))
            .try_filter(move |ingredient| future::ready(seen.insert(ingredient.id.clone())))
            .map_ok(move |ingredient| {
                attach_image(Arc::clone(&objects), images.clone(), bucket.clone(), ingredient)
            })
            .try_buffer_unordered(self.concurrency)
            .boxed()
    }
}

/// Fresh token so every download bypasses caches.
fn cache_token() -> String {
    Uuid::new_v4().simple().to_string()
}

async fn attach_image(
    objects: Arc<dyn ObjectStore>,
    images: ImageRegistry,
    bucket: String,
    ingredient: Ingredient,
) -> Result<EnrichedIngredient, CatalogError> {
    let Some(path) = ingredient
        .image_path
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
    else {
        tracing::debug!(ingredient = %ingredient.id, "No image path, skipping download");
        return Ok(EnrichedIngredient {
            ingredient,
            image: None,
        });
    };

    let image = match objects.download(&bucket, path, Some(&cache_token())).await {
        Ok(bytes) => {
            tracing::debug!(ingredient = %ingredient.id, bytes = bytes.len(), "Image downloaded");
            Some(images.register(bytes))
        }
        Err(e) => {
            tracing::warn!(
                ingredient = %ingredient.id,
                path = %path,
                error = %e,
                "Image download failed, continuing without image"
            );
            None
        }
    };

    Ok(EnrichedIngredient { ingredient, image })
}
