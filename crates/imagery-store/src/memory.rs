//! In-memory `Store` for tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use imagery_core::{CollectionId, ImageId};
use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::types::Image;
use crate::Store;

/// A store that keeps images in a map.
#[derive(Debug)]
pub struct MemoryStore {
    images: RwLock<BTreeMap<ImageId, Image>>,
    healthy: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            images: RwLock::new(BTreeMap::new()),
            healthy: AtomicBool::new(true),
        }
    }
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `health` fail (or succeed again).
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    /// Number of stored images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.read().is_empty()
    }
}

impl Store for MemoryStore {
    fn put_image(&self, image: &Image) -> Result<()> {
        self.images.write().insert(image.id.clone(), image.clone());
        Ok(())
    }

    fn get_image(&self, image_id: &ImageId) -> Result<Option<Image>> {
        Ok(self.images.read().get(image_id).cloned())
    }

    fn list_images(&self) -> Result<Vec<Image>> {
        Ok(self.images.read().values().cloned().collect())
    }

    fn list_images_by_collection(&self, collection_id: &CollectionId) -> Result<Vec<Image>> {
        Ok(self
            .images
            .read()
            .values()
            .filter(|image| &image.collection_id == collection_id)
            .cloned()
            .collect())
    }

    fn health(&self) -> Result<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("health check disabled".to_string()))
        }
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}
