//! `RocksDB` storage layer for imagery.
//!
//! This crate provides persistent storage for image documents using `RocksDB`
//! with column families for efficient indexing.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `images`: Primary image records, keyed by `image_id`
//! - `images_by_collection`: Index for listing images by collection
//!
//! # Example
//!
//! ```no_run
//! use imagery_core::CollectionId;
//! use imagery_store::{RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/imagery-db").unwrap();
//!
//! // List images in a collection
//! let images = store
//!     .list_images_by_collection(&CollectionId::new("weekly-release"))
//!     .unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod rocks;
pub mod schema;
pub mod types;

pub use error::{Result, StoreError};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryStore;
pub use rocks::RocksStore;
pub use types::{Download, Image, License, Upload};

use imagery_core::{CollectionId, ImageId};

/// The storage trait defining all database operations.
///
/// Writes are whole-document upserts; read-modify-write sequences are the
/// caller's concern. This trait abstracts the storage layer, allowing for
/// different implementations (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    /// Insert or update an image record.
    ///
    /// This also maintains the collection index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_image(&self, image: &Image) -> Result<()>;

    /// Get an image by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_image(&self, image_id: &ImageId) -> Result<Option<Image>>;

    /// List all images in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_images(&self) -> Result<Vec<Image>>;

    /// List all images belonging to a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_images_by_collection(&self, collection_id: &CollectionId) -> Result<Vec<Image>>;

    /// Probe the database for liveness.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot serve reads.
    fn health(&self) -> Result<()>;

    /// Flush buffered writes to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&self) -> Result<()>;
}
