use serde::{Deserialize, Serialize};

/// Root configuration container.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the hosted backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project URL (e.g., "https://abcd.supabase.co").
    #[serde(default = "default_backend_url")]
    pub url: String,
    /// Public (anon) API key sent with every request.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// HTTP client defaults.
///
/// No timeout is applied unless one is configured: a hung backend call
/// hangs the stage waiting on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Total request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Connection timeout in seconds.
    #[serde(default)]
    pub connect_timeout_seconds: Option<u64>,
    /// Max idle connections per host (default: 8).
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,
}

/// Names and tuning knobs of the recipe collections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogSettings {
    #[serde(default = "default_recipes_table")]
    pub recipes_table: String,
    #[serde(default = "default_recipe_id_field")]
    pub recipe_id_field: String,
    #[serde(default = "default_ingredients_table")]
    pub ingredients_table: String,
    #[serde(default = "default_ingredient_id_field")]
    pub ingredient_id_field: String,
    /// Storage bucket holding ingredient images.
    #[serde(default = "default_image_bucket")]
    pub image_bucket: String,
    /// Max image downloads in flight per enrichment run (default: 8).
    #[serde(default = "default_image_fetch_concurrency")]
    pub image_fetch_concurrency: usize,
    /// Insert attempts when allocating a recipe id (default: 3).
    #[serde(default = "default_max_create_retries")]
    pub max_create_retries: u32,
}

/// File logging; off unless `file` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base name of the log file; a timestamp and pid are appended.
    #[serde(default)]
    pub file: Option<String>,
    /// `EnvFilter` directives used when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:54321".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_pool_max_idle_per_host() -> usize {
    8
}

fn default_recipes_table() -> String {
    "meals".to_string()
}

fn default_recipe_id_field() -> String {
    "idMeal".to_string()
}

fn default_ingredients_table() -> String {
    "ingredients".to_string()
}

fn default_ingredient_id_field() -> String {
    "idIngredient".to_string()
}

fn default_image_bucket() -> String {
    "recipes".to_string()
}

fn default_image_fetch_concurrency() -> usize {
    8
}

fn default_max_create_retries() -> u32 {
    3
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: default_backend_url(),
            api_key: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: None,
            filter: default_log_filter(),
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            connect_timeout_seconds: None,
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
        }
    }
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            recipes_table: default_recipes_table(),
            recipe_id_field: default_recipe_id_field(),
            ingredients_table: default_ingredients_table(),
            ingredient_id_field: default_ingredient_id_field(),
            image_bucket: default_image_bucket(),
            image_fetch_concurrency: default_image_fetch_concurrency(),
            max_create_retries: default_max_create_retries(),
        }
    }
}
