//! Request types and configuration for image operations.
//!
//! Update requests are partial: a `None` field leaves the stored value alone.

use imagery_core::CollectionId;
use imagery_store::{License, Upload};
use serde::{Deserialize, Serialize};

use crate::links::UrlTemplates;

/// Configuration for the image service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControlConfig {
    /// Whether this instance serves the publishing (editorial) side.
    ///
    /// Web instances only expose published images.
    #[serde(default = "ControlConfig::default_publishing")]
    pub publishing: bool,
    /// Templates for download links.
    #[serde(default)]
    pub url_templates: UrlTemplates,
}

impl ControlConfig {
    const fn default_publishing() -> bool {
        true
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            publishing: Self::default_publishing(),
            url_templates: UrlTemplates::default(),
        }
    }
}

/// Request to create a new image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewImage {
    /// Collection the image belongs to.
    pub collection_id: CollectionId,
    /// Original file name.
    #[serde(default)]
    pub filename: String,
    /// Free-form image type.
    #[serde(default, rename = "type")]
    pub image_type: String,
    /// Licence details.
    #[serde(default)]
    pub license: Option<License>,
}

impl NewImage {
    /// Create a request for the given collection and file name.
    #[must_use]
    pub fn new(collection_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            collection_id: CollectionId::new(collection_id),
            filename: filename.into(),
            image_type: String::new(),
            license: None,
        }
    }
}

/// Partial update of an image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageUpdate {
    /// New collection.
    #[serde(default)]
    pub collection_id: Option<CollectionId>,
    /// New file name.
    #[serde(default)]
    pub filename: Option<String>,
    /// New image type.
    #[serde(default, rename = "type")]
    pub image_type: Option<String>,
    /// New licence.
    #[serde(default)]
    pub license: Option<License>,
    /// Uploaded source file.
    #[serde(default)]
    pub upload: Option<Upload>,
    /// Target state.
    #[serde(default)]
    pub state: Option<String>,
}

/// Request to register a new download variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDownload {
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Format type.
    #[serde(default, rename = "type")]
    pub download_type: Option<String>,
    /// Width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
    /// Path in private storage.
    #[serde(default)]
    pub private: Option<String>,
}

/// Partial update of a download variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadUpdate {
    /// Size in bytes.
    #[serde(default)]
    pub size: Option<u64>,
    /// Format type.
    #[serde(default, rename = "type")]
    pub download_type: Option<String>,
    /// Width in pixels.
    #[serde(default)]
    pub width: Option<u32>,
    /// Height in pixels.
    #[serde(default)]
    pub height: Option<u32>,
    /// Path in private storage.
    #[serde(default)]
    pub private: Option<String>,
    /// Target state.
    #[serde(default)]
    pub state: Option<String>,
    /// Failure description; required when moving to `failed`.
    #[serde(default)]
    pub error: Option<String>,
}

impl DownloadUpdate {
    /// An update that only changes the state.
    #[must_use]
    pub fn state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            ..Self::default()
        }
    }
}
