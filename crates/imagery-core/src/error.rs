//! Validation errors shared across crates.
//!
//! These are reported synchronously to the caller and never retried.

use thiserror::Error;

/// A result type using `ValidationError`.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Malformed input detected while parsing or validating an image document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The string is not a member of the image state enumeration.
    #[error("invalid image state: {0:?}")]
    InvalidImageState(String),

    /// The string is not a member of the download state enumeration.
    #[error("invalid download state: {0:?}")]
    InvalidDownloadState(String),

    /// The image filename exceeds the maximum allowed length.
    #[error("image filename is too long: {len} characters, maximum is {max}")]
    FilenameTooLong {
        /// Length of the rejected filename in characters.
        len: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A field required by the operation was missing or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
