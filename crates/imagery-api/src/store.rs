//! Async store handle.
//!
//! Wraps any [`Store`] so the service can health-check and close it.

use async_trait::async_trait;

use imagery_core::{CollectionId, ImageId};
use imagery_store::{Image, Store};

use crate::dependencies::{Checker, DataStore};
use crate::error::DependencyError;

/// [`DataStore`] over a synchronous store.
pub struct StoreHandle<S> {
    inner: S,
}

impl<S: Store> StoreHandle<S> {
    /// Wrap a store.
    #[must_use]
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// The wrapped store.
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Store> Store for StoreHandle<S> {
    fn put_image(&self, image: &Image) -> imagery_store::Result<()> {
        self.inner.put_image(image)
    }

    fn get_image(&self, image_id: &ImageId) -> imagery_store::Result<Option<Image>> {
        self.inner.get_image(image_id)
    }

    fn list_images(&self) -> imagery_store::Result<Vec<Image>> {
        self.inner.list_images()
    }

    fn list_images_by_collection(
        &self,
        collection_id: &CollectionId,
    ) -> imagery_store::Result<Vec<Image>> {
        self.inner.list_images_by_collection(collection_id)
    }

    fn health(&self) -> imagery_store::Result<()> {
        self.inner.health()
    }

    fn flush(&self) -> imagery_store::Result<()> {
        self.inner.flush()
    }
}

#[async_trait]
impl<S: Store> Checker for StoreHandle<S> {
    async fn check(&self) -> Result<(), DependencyError> {
        Ok(self.inner.health()?)
    }
}

#[async_trait]
impl<S: Store> DataStore for StoreHandle<S> {
    async fn close(&self) -> Result<(), DependencyError> {
        self.inner.flush()?;
        tracing::info!("Store flushed and closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imagery_store::{MemoryStore, RocksStore};
    use tempfile::TempDir;

    #[tokio::test]
    async fn check_follows_store_health() {
        let handle = StoreHandle::new(MemoryStore::new());
        assert!(handle.check().await.is_ok());

        handle.inner().set_healthy(false);
        assert!(matches!(
            handle.check().await,
            Err(DependencyError::Store(_))
        ));
    }

    #[tokio::test]
    async fn close_flushes_rocks() {
        let dir = TempDir::new().unwrap();
        let handle = StoreHandle::new(RocksStore::open(dir.path()).unwrap());

        let image = Image::new(ImageId::new("img-1"), CollectionId::new("col-1"));
        handle.put_image(&image).unwrap();
        handle.close().await.unwrap();

        assert_eq!(handle.get_image(&image.id).unwrap(), Some(image));
    }
}
