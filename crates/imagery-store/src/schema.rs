//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary image records, keyed by `image_id`.
    pub const IMAGES: &str = "images";

    /// Index: images by collection, keyed by `collection_id || 0x00 || image_id`.
    pub const IMAGES_BY_COLLECTION: &str = "images_by_collection";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::IMAGES, cf::IMAGES_BY_COLLECTION]
}
