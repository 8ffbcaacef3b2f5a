//! Error types for image request handling.
//!
//! Validation failures and denied transitions are separate variants so the
//! HTTP layer can map them to different responses.

use imagery_core::{DownloadState, ImageId, ImageState, ValidationError};
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur while handling image requests.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The requested image was not found.
    #[error("image not found: {0}")]
    ImageNotFound(ImageId),

    /// The requested download variant was not found.
    #[error("download {variant} not found for image {image_id}")]
    DownloadNotFound {
        /// The image that was searched.
        image_id: ImageId,
        /// The missing variant.
        variant: String,
    },

    /// A download variant with this name is already registered.
    #[error("download {variant} already exists for image {image_id}")]
    DownloadAlreadyExists {
        /// The image that owns the variant.
        image_id: ImageId,
        /// The duplicated variant.
        variant: String,
    },

    /// The request carried malformed input.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The image state change is well formed but not currently allowed.
    #[error("image {image_id} cannot transition from {from} to {to}")]
    ImageTransitionDenied {
        /// The image being transitioned.
        image_id: ImageId,
        /// The current state.
        from: ImageState,
        /// The requested target state.
        to: ImageState,
    },

    /// The download state change is well formed but not currently allowed.
    #[error("download {variant} of image {image_id} cannot transition from {from} to {to}")]
    DownloadTransitionDenied {
        /// The image that owns the variant.
        image_id: ImageId,
        /// The variant being transitioned.
        variant: String,
        /// The current state.
        from: DownloadState,
        /// The requested target state.
        to: DownloadState,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] imagery_store::StoreError),

    /// An event could not be encoded or handed to the producer.
    #[error("producer error: {0}")]
    Producer(String),
}

impl ControlError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::ImageNotFound(_) | Self::DownloadNotFound { .. } => 404,
            Self::Validation(_) => 400,
            Self::DownloadAlreadyExists { .. }
            | Self::ImageTransitionDenied { .. }
            | Self::DownloadTransitionDenied { .. } => 409,
            Self::Store(_) | Self::Producer(_) => 500,
        }
    }

    /// Returns true if the request was well formed but the state change is not allowed.
    #[must_use]
    pub const fn is_transition_denied(&self) -> bool {
        matches!(
            self,
            Self::ImageTransitionDenied { .. } | Self::DownloadTransitionDenied { .. }
        )
    }
}
