//! Domain types stored in the database.
//!
//! These types represent the persisted image documents. States are kept in
//! their string form because a stored document may predate the current
//! enumeration; the state engine parses them on every check.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use imagery_core::{CollectionId, ImageId};
use serde::{Deserialize, Serialize};

/// An image record stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Unique identifier for the image.
    pub id: ImageId,
    /// Collection the image is edited in.
    pub collection_id: CollectionId,
    /// Current lifecycle state; empty when unset.
    #[serde(default)]
    pub state: String,
    /// Original file name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub filename: String,
    /// Free-form image type (e.g. "chart").
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub image_type: String,
    /// Licence the image is published under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    /// Location of the uploaded source file, once uploaded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<Upload>,
    /// Download variants keyed by variant name (e.g. "original", "png_bw").
    #[serde(default)]
    pub downloads: BTreeMap<String, Download>,
    /// Last modification timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Image {
    /// Create an image with no state, file or downloads.
    #[must_use]
    pub fn new(id: ImageId, collection_id: CollectionId) -> Self {
        Self {
            id,
            collection_id,
            state: String::new(),
            filename: String::new(),
            image_type: String::new(),
            license: None,
            upload: None,
            downloads: BTreeMap::new(),
            last_updated: None,
        }
    }
}

/// Licence details for an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Licence title.
    pub title: String,
    /// Link to the licence text.
    pub href: String,
}

/// Uploaded source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    /// Path of the source file in upload storage.
    pub path: String,
}

/// A download variant of an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Download {
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Format type (e.g. "png").
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub download_type: Option<String>,
    /// Width in pixels, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Height in pixels, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Current download state; empty when unset.
    #[serde(default)]
    pub state: String,
    /// Path in private storage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<String>,
    /// Whether the variant is served from the public host. Derived from state.
    #[serde(default)]
    pub public: bool,
    /// Access URL. Derived from state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Failure description, only set in the failed state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the import started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_started: Option<DateTime<Utc>>,
    /// When the import completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_completed: Option<DateTime<Utc>>,
    /// When publishing started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_started: Option<DateTime<Utc>>,
    /// When publishing completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_completed: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_state_deserializes_as_empty() {
        let image: Image =
            serde_json::from_str(r#"{"id":"img-1","collection_id":"col-1"}"#).unwrap();
        assert!(image.state.is_empty());
        assert!(image.downloads.is_empty());
    }

    #[test]
    fn type_fields_use_wire_names() {
        let mut image = Image::new(ImageId::new("img-1"), CollectionId::new("col-1"));
        image.image_type = "chart".to_string();
        image.downloads.insert(
            "original".to_string(),
            Download {
                download_type: Some("png".to_string()),
                ..Download::default()
            },
        );

        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json["type"], "chart");
        assert_eq!(json["downloads"]["original"]["type"], "png");
    }
}
