//! Data access and reactive sync layer of the recipe catalog.

pub mod auth;
pub mod backend;
pub mod bridge;
pub mod catalog;
pub mod config;
pub mod enrich;
pub mod error;
pub mod images;
pub mod logging;
pub mod model;
pub mod query;
pub mod writes;

pub use auth::{AuthState, AuthStore};
pub use bridge::{Cold, Event, Subscription};
pub use catalog::RecipeCatalog;
pub use config::Config;
pub use error::CatalogError;
pub use model::{EnrichedIngredient, Ingredient, Recipe, RecipeDraft, RecipePatch};
