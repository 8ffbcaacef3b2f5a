//! HTTP service and lifecycle orchestration for imagery.
//!
//! This crate wires the image request logic to its external dependencies:
//!
//! - REST endpoints for images and their download variants
//! - Broker producers for the uploaded and published topics
//! - A health monitor probing every dependency
//! - Ordered startup and timeout-bounded shutdown of all of the above
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Clients                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        imagery-api                           │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐   │
//! │  │   Router    │ │   Health    │ │      Service        │   │
//! │  │ + Handlers  │ │  Registry   │ │  (run / close)      │   │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!        ┌─────────────┬───────┴───────┬──────────────┐
//!        ▼             ▼               ▼              ▼
//!   ┌─────────┐  ┌──────────┐   ┌────────────┐  ┌─────────────┐
//!   │  Store  │  │ Uploaded │   │ Published  │  │ Permissions │
//!   │(RocksDB)│  │ producer │   │  producer  │  │     API     │
//!   └─────────┘  └──────────┘   └────────────┘  └─────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use imagery_api::{ExternalInit, Service, ServiceConfig};
//! use tokio::sync::mpsc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::from_env();
//! let timeout = config.graceful_shutdown_timeout();
//! let (errors_tx, mut errors_rx) = mpsc::channel(1);
//!
//! let service = Service::run(config, &ExternalInit, errors_tx).await?;
//! let _ = errors_rx.recv().await;
//! service.close(timeout).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod dependencies;
pub mod error;
pub mod handlers;
pub mod health;
pub mod init;
pub mod permissions;
pub mod producer;
pub mod routes;
pub mod server;
pub mod service;
pub mod state;
pub mod store;

pub use config::ServiceConfig;
pub use dependencies::{Checker, CheckerRef, DataStore, HealthMonitor, Listener, Producer};
pub use error::{ApiError, Dependency, DependencyError, HealthError, ReleaseFailure, ServiceError};
pub use health::{CheckState, CheckStatus, HealthRegistry, HealthReport};
pub use init::{ExternalInit, Initialiser};
pub use routes::create_router;
pub use service::{Acquired, Service, StartupFailure};
pub use state::{AppState, Images};
pub use store::StoreHandle;
