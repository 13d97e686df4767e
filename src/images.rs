//! In-process registry of downloaded image bytes.
//!
//! The enrichment pipeline registers every downloaded image here and hands
//! out an [`ImageHandle`]. A handle resolves to a `blob:` style URL that the
//! UI layer can look up; the bytes stay alive until the handle is disposed
//! or dropped.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:recipe-catalog/";

/// Shared store of image bytes keyed by handle id.
#[derive(Clone, Default)]
pub struct ImageRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Bytes>>>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` and return the owning handle.
    pub fn register(&self, bytes: Bytes) -> ImageHandle {
        let id = Uuid::new_v4();
        self.inner.write().insert(id, bytes);
        ImageHandle {
            id,
            registry: self.clone(),
        }
    }

    /// Look up the bytes behind a handle URL.
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        let id = url.strip_prefix(URL_PREFIX)?;
        let id = Uuid::parse_str(id).ok()?;
        self.inner.read().get(&id).cloned()
    }

    /// Number of images currently held.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    fn release(&self, id: &Uuid) {
        self.inner.write().remove(id);
    }
}

/// Owning reference to one downloaded image.
///
/// Not `Clone`: exactly one owner is responsible for the release.
pub struct ImageHandle {
    id: Uuid,
    registry: ImageRegistry,
}

impl ImageHandle {
    /// Locally resolvable URL for this image.
    pub fn url(&self) -> String {
        format!("{}{}", URL_PREFIX, self.id)
    }

    pub fn bytes(&self) -> Option<Bytes> {
        self.registry.inner.read().get(&self.id).cloned()
    }

    /// Release the image bytes now.
    pub fn dispose(self) {
        // Drop does the release.
    }
}

impl Drop for ImageHandle {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}

impl std::fmt::Debug for ImageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHandle").field("url", &self.url()).finish()
    }
}
