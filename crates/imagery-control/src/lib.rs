//! Image state engine and request logic for imagery.
//!
//! This crate holds the rules that every state-changing request passes
//! through before anything is written to the store or emitted to the broker.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HTTP handlers (api)                     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ImageService                          │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │  Lifecycle  │ │   Links     │ │    Events           │   │
//! │  │  (states)   │ │ (href/pub)  │ │  (uploaded/pub'd)   │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┴──────────────┐
//!               ▼                             ▼
//!        ┌──────────┐                  ┌──────────────┐
//!        │  Store   │                  │  Producers   │
//!        │ (RocksDB)│                  │ (broker)     │
//!        └──────────┘                  └──────────────┘
//! ```
//!
//! # State Machine
//!
//! Images:
//!
//! - `created` → `uploaded` or `deleted`
//! - `uploaded` → `publishing` or `deleted`
//! - `publishing` → `uploaded` (abort), `published` or `deleted`
//! - `published` → `deleted`
//! - `deleted` is terminal
//!
//! Downloads:
//!
//! - `pending` → `importing`
//! - `importing` → `imported` or `failed`
//! - `imported` → `published`
//! - `published` → `completed`
//! - `completed` and `failed` are terminal
//!
//! See the [`lifecycle`] module for transition validation helpers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod events;
pub mod lifecycle;
pub mod links;
pub mod service;
pub mod types;

pub use error::{ControlError, Result};
pub use events::{EventProducer, ImagePublished, ImageUploaded};
pub use links::UrlTemplates;
pub use service::ImageService;
pub use types::{ControlConfig, DownloadUpdate, ImageUpdate, NewDownload, NewImage};

// Re-export commonly used types from dependencies for convenience
pub use imagery_core::{CollectionId, DownloadState, ImageId, ImageState, ValidationError};
pub use imagery_store::{Download, Image, License, Store, Upload};
