//! Image and download state enumerations.
//!
//! Both are closed sets with a canonical lowercase string form. Parsing is an
//! exact, case-sensitive match against that form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle states for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageState {
    /// Metadata registered, no file yet.
    Created,
    /// Source file uploaded to private storage.
    Uploaded,
    /// Publish requested, downloads being moved to the public host.
    Publishing,
    /// All downloads are served publicly.
    Published,
    /// Logically retired. Terminal.
    Deleted,
}

impl ImageState {
    /// Every state, in enumeration order.
    pub const ALL: [Self; 5] = [
        Self::Created,
        Self::Uploaded,
        Self::Publishing,
        Self::Published,
        Self::Deleted,
    ];

    /// The first member, used when a stored state is missing.
    #[must_use]
    pub const fn initial() -> Self {
        Self::Created
    }

    /// Canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Uploaded => "uploaded",
            Self::Publishing => "publishing",
            Self::Published => "published",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ImageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidImageState(s.to_string()))
    }
}

/// Lifecycle states for a single download variant of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Registered, waiting for the importer.
    Pending,
    /// Importer is producing the variant.
    Importing,
    /// Variant stored privately.
    Imported,
    /// Variant handed to the static file publisher.
    Published,
    /// Variant served from the public host. Terminal.
    Completed,
    /// Import failed. Terminal.
    Failed,
}

impl DownloadState {
    /// Every state, in enumeration order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Importing,
        Self::Imported,
        Self::Published,
        Self::Completed,
        Self::Failed,
    ];

    /// The first member, used when a stored state is missing.
    #[must_use]
    pub const fn initial() -> Self {
        Self::Pending
    }

    /// Canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Importing => "importing",
            Self::Imported => "imported",
            Self::Published => "published",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for DownloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DownloadState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidDownloadState(s.to_string()))
    }
}
