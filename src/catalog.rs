//! Recipe-domain entry point for the UI layer.
//!
//! [`RecipeCatalog`] wires the query executor, writer, enricher and auth
//! store over one backend. Reads and writes come back as [`Cold`]
//! sequences so the caller decides when (and how often) they run.

use std::sync::Arc;

use futures::stream::BoxStream;

use crate::auth::AuthStore;
use crate::backend::{MemoryBackend, ObjectStore, RestBackend, RowStore};
use crate::bridge::Cold;
use crate::config::{CatalogSettings, Config};
use crate::enrich::IngredientEnricher;
use crate::error::CatalogError;
use crate::images::ImageRegistry;
use crate::model::{EnrichedIngredient, Ingredient, Recipe, RecipeDraft, RecipePatch};
use crate::query::{QueryExecutor, QuerySpec};
use crate::writes::RecipeWriter;

/// The recipe catalog service.
///
/// Cloning is cheap; clones share the backend, auth state and image
/// registry.
#[derive(Clone)]
pub struct RecipeCatalog {
    executor: QueryExecutor,
    writer: RecipeWriter,
    enricher: IngredientEnricher,
    auth: AuthStore,
    images: ImageRegistry,
    settings: Arc<CatalogSettings>,
}

impl RecipeCatalog {
    pub fn new(
        rows: Arc<dyn RowStore>,
        objects: Arc<dyn ObjectStore>,
        auth: AuthStore,
        settings: CatalogSettings,
    ) -> Self {
        let executor = QueryExecutor::new(Arc::clone(&rows));
        let writer = RecipeWriter::new(rows, &settings);
        let images = ImageRegistry::new();
        let enricher = IngredientEnricher::new(executor.clone(), objects, images.clone(), &settings);

        Self {
            executor,
            writer,
            enricher,
            auth,
            images,
            settings: Arc::new(settings),
        }
    }

    /// Connect to the hosted backend described by `config` and run the
    /// startup session check.
    pub async fn connect(config: &Config) -> Result<Self, CatalogError> {
        let backend = Arc::new(RestBackend::new(config)?);
        tracing::info!(url = %config.backend.url, "Connecting recipe catalog");
        let auth = AuthStore::connect(backend.clone()).await;
        Ok(Self::new(
            backend.clone(),
            backend,
            auth,
            config.catalog.clone(),
        ))
    }

    /// Catalog over an in-process backend.
    pub async fn in_memory(backend: MemoryBackend, settings: CatalogSettings) -> Self {
        let backend = Arc::new(backend);
        let auth = AuthStore::connect(backend.clone()).await;
        Self::new(backend.clone(), backend, auth, settings)
    }

    /// All recipes, or only the one whose id equals `search`.
    pub fn meals(&self, search: Option<&str>) -> Cold<Vec<Recipe>> {
        let mut spec = QuerySpec::new(self.settings.recipes_table.clone());
        if let Some(id) = search.map(str::trim).filter(|s| !s.is_empty()) {
            spec = spec.filter(self.settings.recipe_id_field.clone(), id);
        }
        self.executor.observe_as(spec)
    }

    /// The recipe with `id`, if any.
    pub fn recipe(&self, id: &str) -> Cold<Option<Recipe>> {
        let spec = QuerySpec::new(self.settings.recipes_table.clone())
            .filter(self.settings.recipe_id_field.clone(), id);
        self.executor
            .observe_as::<Recipe>(spec)
            .map(|recipes| recipes.into_iter().next())
    }

    /// Ingredients for `ids` with their images, as they arrive.
    pub fn ingredients(
        &self,
        ids: Vec<Option<String>>,
    ) -> BoxStream<'static, Result<EnrichedIngredient, CatalogError>> {
        self.enricher.enrich(ids)
    }

    /// Every ingredient, without images.
    pub fn all_ingredients(&self) -> Cold<Vec<Ingredient>> {
        self.executor
            .observe_as(QuerySpec::new(self.settings.ingredients_table.clone()))
    }

    pub fn update_recipe(&self, id: impl Into<String>, patch: RecipePatch) -> Cold<Recipe> {
        let writer = self.writer.clone();
        let id = id.into();
        Cold::new(move || {
            let writer = writer.clone();
            let id = id.clone();
            let patch = patch.clone();
            async move { writer.update(&id, &patch).await }
        })
    }

    /// Insert `recipe` under the id it already carries.
    pub fn create_recipe(&self, recipe: Recipe) -> Cold<Recipe> {
        let writer = self.writer.clone();
        Cold::new(move || {
            let writer = writer.clone();
            let recipe = recipe.clone();
            async move { writer.create(&recipe).await }
        })
    }

    /// Insert `draft` under a freshly allocated id.
    pub fn create_recipe_with_next_id(&self, draft: RecipeDraft) -> Cold<Recipe> {
        let writer = self.writer.clone();
        Cold::new(move || {
            let writer = writer.clone();
            let draft = draft.clone();
            async move { writer.create_next(draft).await }
        })
    }

    pub fn last_recipe_id(&self) -> Cold<u64> {
        let writer = self.writer.clone();
        Cold::new(move || {
            let writer = writer.clone();
            async move { writer.last_id().await }
        })
    }

    pub fn auth(&self) -> &AuthStore {
        &self.auth
    }

    /// Registry resolving the image URLs handed out by [`Self::ingredients`].
    pub fn images(&self) -> &ImageRegistry {
        &self.images
    }
}
