//! Application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use imagery_control::ImageService;

use crate::config::ServiceConfig;
use crate::dependencies::{DataStore, HealthMonitor, Producer};

/// The image service as wired by the running service.
pub type Images = ImageService<dyn DataStore, dyn Producer>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Image request handling.
    pub images: Arc<Images>,
    /// Health monitor backing `/health`.
    pub health: Arc<dyn HealthMonitor>,
    /// Service configuration.
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        images: Arc<Images>,
        health: Arc<dyn HealthMonitor>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            images,
            health,
            config,
        }
    }
}
