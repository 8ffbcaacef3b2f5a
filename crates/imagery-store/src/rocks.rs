//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use imagery_core::{CollectionId, ImageId};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::types::Image;
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &'static str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or(StoreError::MissingColumnFamily(name))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Encode(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Decode(e.to_string()))
    }
}

impl Store for RocksStore {
    fn put_image(&self, image: &Image) -> Result<()> {
        let cf_images = self.cf(cf::IMAGES)?;
        let cf_by_collection = self.cf(cf::IMAGES_BY_COLLECTION)?;

        let image_key = keys::image_key(&image.id);
        let collection_key = keys::collection_image_key(&image.collection_id, &image.id);
        let value = Self::serialize(image)?;

        // Check if image exists to handle collection index updates
        let old_collection = self
            .get_image(&image.id)?
            .map(|existing| existing.collection_id);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_images, &image_key, &value);

        if let Some(old) = old_collection {
            if old != image.collection_id {
                batch.delete_cf(&cf_by_collection, keys::collection_image_key(&old, &image.id));
            }
        }
        batch.put_cf(&cf_by_collection, &collection_key, []);

        self.db.write(batch)?;
        Ok(())
    }

    fn get_image(&self, image_id: &ImageId) -> Result<Option<Image>> {
        let cf = self.cf(cf::IMAGES)?;
        let key = keys::image_key(image_id);

        self.db
            .get_cf(&cf, key)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_images(&self) -> Result<Vec<Image>> {
        let cf = self.cf(cf::IMAGES)?;

        let mut images = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            images.push(Self::deserialize(&value)?);
        }

        Ok(images)
    }

    fn list_images_by_collection(&self, collection_id: &CollectionId) -> Result<Vec<Image>> {
        let cf_by_collection = self.cf(cf::IMAGES_BY_COLLECTION)?;
        let prefix = keys::collection_prefix(collection_id);

        let mut images = Vec::new();
        let iter = self.db.iterator_cf(
            &cf_by_collection,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item?;

            // Stop if we're past the prefix
            if !key.starts_with(&prefix) {
                break;
            }

            let Some(image_id) = keys::image_id_from_collection_key(&prefix, &key) else {
                tracing::warn!(key = ?key, "Skipping malformed collection index key");
                continue;
            };
            // Ids containing the separator can share a prefix with another collection.
            match self.get_image(&image_id)? {
                Some(image) if image.collection_id == *collection_id => images.push(image),
                _ => {}
            }
        }

        Ok(images)
    }

    fn health(&self) -> Result<()> {
        let cf = self.cf(cf::IMAGES)?;
        self.db.get_cf(&cf, b"")?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        for name in all_column_families() {
            let cf = self.cf(name)?;
            self.db.flush_cf(&cf)?;
        }
        Ok(())
    }
}
