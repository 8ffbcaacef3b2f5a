//! Image and download state machines.
//!
//! This module defines the valid state transitions for images and their
//! download variants, and the validation applied to stored documents.
//!
//! # Image state machine
//!
//! ```text
//!   ┌─────────┐     ┌──────────┐     ┌────────────┐     ┌───────────┐
//!   │ Created │────▶│ Uploaded │────▶│ Publishing │────▶│ Published │
//!   └────┬────┘     └────┬─────┘◀────└─────┬──────┘     └─────┬─────┘
//!        │               │    (abort)      │                  │
//!        ▼               ▼                 ▼                  ▼
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                           Deleted                            │
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Download state machine
//!
//! ```text
//!   Pending ──▶ Importing ──▶ Imported ──▶ Published ──▶ Completed
//!                   │
//!                   └───────▶ Failed
//! ```
//!
//! Checking a transition and validating a stored document are deliberately
//! separate: a missing or unparseable current state counts as the initial
//! state when checking a transition, but is an error when validating.

use imagery_core::{DownloadState, ImageState, ValidationError};
use imagery_store::{Download, Image};

/// Maximum length of an image filename, in characters.
pub const MAX_FILENAME_LENGTH: usize = 40;

/// Returns the states an image may move to from `from`, including itself.
#[must_use]
pub const fn image_targets(from: ImageState) -> &'static [ImageState] {
    use ImageState::{Created, Deleted, Published, Publishing, Uploaded};

    match from {
        Created => &[Created, Uploaded, Deleted],
        Uploaded => &[Uploaded, Publishing, Deleted],
        // Publishing may revert to Uploaded when a publish is aborted
        Publishing => &[Publishing, Uploaded, Published, Deleted],
        Published => &[Published, Deleted],
        Deleted => &[],
    }
}

/// Returns the states a download may move to from `from`, including itself.
#[must_use]
pub const fn download_targets(from: DownloadState) -> &'static [DownloadState] {
    use DownloadState::{Completed, Failed, Imported, Importing, Pending, Published};

    match from {
        Pending => &[Pending, Importing],
        Importing => &[Importing, Imported, Failed],
        Imported => &[Imported, Published],
        Published => &[Published, Completed],
        Completed | Failed => &[],
    }
}

/// Check if an image state transition is valid according to the state machine.
#[must_use]
pub fn image_transition_allowed(from: ImageState, to: ImageState) -> bool {
    image_targets(from).contains(&to)
}

/// Check if a download state transition is valid according to the state machine.
#[must_use]
pub fn download_transition_allowed(from: DownloadState, to: DownloadState) -> bool {
    download_targets(from).contains(&to)
}

/// Returns true if no further transition is possible from the image state.
#[must_use]
pub const fn is_image_terminal(state: ImageState) -> bool {
    image_targets(state).is_empty()
}

/// Returns true if no further transition is possible from the download state.
#[must_use]
pub const fn is_download_terminal(state: DownloadState) -> bool {
    download_targets(state).is_empty()
}

// =============================================================================
// Transition checks (lenient about the current state)
// =============================================================================

/// The image's current state for transition checks.
///
/// Empty or unparseable stored values count as the initial state.
#[must_use]
pub fn current_image_state(image: &Image) -> ImageState {
    image.state.parse().unwrap_or(ImageState::initial())
}

/// The download's current state for transition checks.
///
/// Empty or unparseable stored values count as the initial state.
#[must_use]
pub fn current_download_state(download: &Download) -> DownloadState {
    download.state.parse().unwrap_or(DownloadState::initial())
}

/// Check whether `image` may move to the state named by `target`.
///
/// Returns false if `target` does not name an image state.
#[must_use]
pub fn is_image_transition_allowed(image: &Image, target: &str) -> bool {
    target
        .parse::<ImageState>()
        .is_ok_and(|to| image_transition_allowed(current_image_state(image), to))
}

/// Check whether `download` may move to the state named by `target`.
///
/// Returns false if `target` does not name a download state.
#[must_use]
pub fn is_download_transition_allowed(download: &Download, target: &str) -> bool {
    target
        .parse::<DownloadState>()
        .is_ok_and(|to| download_transition_allowed(current_download_state(download), to))
}

// =============================================================================
// Validation (strict about stored values)
// =============================================================================

/// Validate a stored or incoming image document.
///
/// Checks the filename length, then the image state (if set), then every
/// download state (if set), stopping at the first failure.
///
/// # Errors
///
/// Returns `ValidationError::FilenameTooLong`, `InvalidImageState` or
/// `InvalidDownloadState`.
pub fn validate_image(image: &Image) -> Result<(), ValidationError> {
    let len = image.filename.chars().count();
    if len > MAX_FILENAME_LENGTH {
        return Err(ValidationError::FilenameTooLong {
            len,
            max: MAX_FILENAME_LENGTH,
        });
    }

    if !image.state.is_empty() {
        image.state.parse::<ImageState>()?;
    }

    for download in image.downloads.values() {
        validate_download(download)?;
    }

    Ok(())
}

/// Validate a single download.
///
/// # Errors
///
/// Returns `ValidationError::InvalidDownloadState` if the state is set but unknown.
pub fn validate_download(download: &Download) -> Result<(), ValidationError> {
    if !download.state.is_empty() {
        download.state.parse::<DownloadState>()?;
    }
    Ok(())
}
