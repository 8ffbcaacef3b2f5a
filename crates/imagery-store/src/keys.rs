//! Key encoding utilities for `RocksDB`.
//!
//! Identifiers are variable-length strings, so composite keys separate their
//! parts with a zero byte.

use imagery_core::{CollectionId, ImageId};

const SEPARATOR: u8 = 0;

/// Encode an image key (just the image ID bytes).
#[must_use]
pub fn image_key(image_id: &ImageId) -> Vec<u8> {
    image_id.as_str().as_bytes().to_vec()
}

/// Encode a collection prefix for scanning all images in a collection.
#[must_use]
pub fn collection_prefix(collection_id: &CollectionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(collection_id.as_str().len() + 1);
    key.extend_from_slice(collection_id.as_str().as_bytes());
    key.push(SEPARATOR);
    key
}

/// Encode a collection-image index key: `collection_id || 0x00 || image_id`.
#[must_use]
pub fn collection_image_key(collection_id: &CollectionId, image_id: &ImageId) -> Vec<u8> {
    let mut key = collection_prefix(collection_id);
    key.extend_from_slice(image_id.as_str().as_bytes());
    key
}

/// Extract the image ID from a collection-image key scanned under `prefix`.
///
/// Returns `None` if the key does not start with `prefix` or the ID is not UTF-8.
#[must_use]
pub fn image_id_from_collection_key(prefix: &[u8], key: &[u8]) -> Option<ImageId> {
    let rest = key.strip_prefix(prefix)?;
    std::str::from_utf8(rest).ok().map(ImageId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_key_extracts_image_id() {
        let collection = CollectionId::new("col-1");
        let image = ImageId::new("img-42");

        let prefix = collection_prefix(&collection);
        let key = collection_image_key(&collection, &image);
        assert!(key.starts_with(&prefix));
        assert_eq!(image_id_from_collection_key(&prefix, &key), Some(image));
    }

    #[test]
    fn prefix_does_not_match_longer_collection() {
        let short = CollectionId::new("col");
        let long = CollectionId::new("col-2");
        let key = collection_image_key(&long, &ImageId::new("img"));

        assert!(!key.starts_with(&collection_prefix(&short)));
    }

    #[test]
    fn key_outside_prefix() {
        let prefix = collection_prefix(&CollectionId::new("col-1"));
        assert_eq!(image_id_from_collection_key(&prefix, b"col-2\0img"), None);
    }

    #[test]
    fn separator_inside_collection_id() {
        let nested = CollectionId::new("a\0b");
        let prefix = collection_prefix(&nested);
        let key = collection_image_key(&nested, &ImageId::new("img-1"));

        assert_eq!(
            image_id_from_collection_key(&prefix, &key),
            Some(ImageId::new("img-1"))
        );
    }
}
