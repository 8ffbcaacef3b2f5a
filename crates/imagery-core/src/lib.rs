//! Core types and utilities for imagery.
//!
//! This crate provides the foundational types used throughout the imagery backend:
//!
//! - **Identifiers**: Strongly-typed IDs for images and collections
//! - **States**: The image and download state enumerations
//! - **Error types**: Validation errors shared across crates
//!
//! # Example
//!
//! ```
//! use imagery_core::{DownloadState, ImageId, ImageState};
//!
//! // Generate a fresh image ID
//! let image_id = ImageId::generate();
//! assert!(!image_id.as_str().is_empty());
//!
//! // States parse from their canonical string form
//! let state: ImageState = "uploaded".parse().unwrap();
//! assert_eq!(state, ImageState::Uploaded);
//! assert!("Uploaded".parse::<ImageState>().is_err());
//! assert_eq!(DownloadState::initial(), DownloadState::Pending);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod state;

pub use error::{Result, ValidationError};
pub use ids::{CollectionId, ImageId};
pub use state::{DownloadState, ImageState};
