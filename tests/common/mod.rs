//! Shared test utilities and mock infrastructure.

#![allow(dead_code, unused_imports)]

pub mod mock_backend;

use recipe_catalog::backend::{MemoryBackend, RestBackend};
use recipe_catalog::config::{CatalogSettings, Config};
use serde_json::json;
use std::net::TcpListener;
use std::path::PathBuf;
use tempfile::TempDir;

pub const TEST_KEY: &str = "test-anon-key";

/// Find an available port for testing.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to free port");
    listener.local_addr().unwrap().port()
}

/// Config pointing at `url` with the test key.
pub fn config_for(url: &str) -> Config {
    let mut config = Config::default();
    config.backend.url = url.to_string();
    config.backend.api_key = Some(TEST_KEY.to_string());
    config
}

pub fn rest_backend(url: &str) -> RestBackend {
    RestBackend::new(&config_for(url)).expect("Failed to build REST backend")
}

/// Write `content` to a temporary `config.toml`.
pub fn temp_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    (temp_dir, config_path)
}

/// Memory backend holding a small catalog.
///
/// Recipes 52770..=52772; ingredients 1..=4, where 1..=3 have images and
/// 4 has none.
pub fn seeded_backend() -> MemoryBackend {
    let backend = MemoryBackend::for_catalog(&CatalogSettings::default());
    backend.seed(
        "meals",
        vec![
            json!({
                "idMeal": "52770",
                "strMeal": "Spaghetti Bolognese",
                "strInstructions": "Simmer the sauce.",
                "idIngredients": ["1", "2", null],
                "strArea": "Italian"
            }),
            json!({
                "idMeal": "52771",
                "strMeal": "Fried Rice",
                "strInstructions": "Fry.",
                "idIngredients": ["3", null]
            }),
            json!({
                "idMeal": "52772",
                "strMeal": "Teriyaki Chicken",
                "strInstructions": "Glaze.",
                "idIngredients": ["2", "3", "4"]
            }),
        ],
    );
    backend.seed(
        "ingredients",
        vec![
            json!({"idIngredient": "1", "strIngredient": "Tomato", "strStorageimg": "tomato.png", "strType": "Vegetable"}),
            json!({"idIngredient": "2", "strIngredient": "Garlic", "strStorageimg": "garlic.png", "strType": "Vegetable"}),
            json!({"idIngredient": "3", "strIngredient": "Rice", "strStorageimg": "rice.png", "strType": "Grain"}),
            json!({"idIngredient": "4", "strIngredient": "Soy Sauce", "strType": null}),
        ],
    );
    backend.put_object("recipes", "tomato.png", &b"tomato"[..]);
    backend.put_object("recipes", "garlic.png", &b"garlic"[..]);
    backend.put_object("recipes", "rice.png", &b"rice"[..]);
    backend
}
