//! Service lifecycle.
//!
//! Startup acquires dependencies in a fixed order and stops at the first
//! failure. Shutdown releases whatever was acquired, in priority order, from
//! a single background task bounded by the graceful shutdown timeout.
//!
//! ```text
//!   run:   listener handle ─▶ store ─▶ [permissions ─▶ uploaded ─▶ published]
//!          ─▶ health monitor ─▶ register checks ─▶ start monitor + serve
//!
//!   close: stop monitor ─▶ listener ─▶ image service ─▶ store
//!          ─▶ uploaded ─▶ published
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use imagery_control::ImageService;

use crate::config::ServiceConfig;
use crate::dependencies::{Checker, CheckerRef, DataStore, HealthMonitor, Listener, Producer};
use crate::error::{Dependency, DependencyError, ReleaseFailure, ServiceError};
use crate::init::Initialiser;
use crate::routes::create_router;
use crate::state::{AppState, Images};

/// Health check names.
pub mod checks {
    /// Document store.
    pub const STORE: &str = "Store";
    /// Producer for the image-uploaded topic.
    pub const UPLOADED_PRODUCER: &str = "Uploaded Kafka Producer";
    /// Producer for the static-file-published topic.
    pub const PUBLISHED_PRODUCER: &str = "Published Kafka Producer";
    /// Permissions API.
    pub const PERMISSIONS: &str = "Permissions API";
}

/// Which dependencies have been acquired.
///
/// Flags are only set during [`Service::run`] and only read afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Acquired {
    /// The listener is serving.
    pub listener: bool,
    /// The store is open.
    pub store: bool,
    /// The permissions client exists.
    pub permissions: bool,
    /// The uploaded producer is connected.
    pub uploaded_producer: bool,
    /// The published producer is connected.
    pub published_producer: bool,
    /// The health monitor exists.
    pub health_monitor: bool,
}

/// A failed startup, with whatever had been acquired so the caller can
/// release it.
pub struct StartupFailure {
    /// Why startup stopped.
    pub error: ServiceError,
    /// The partially started service.
    pub service: Service,
}

impl StartupFailure {
    /// The dependencies acquired before the failure.
    #[must_use]
    pub const fn acquired(&self) -> Acquired {
        self.service.acquired
    }
}

impl fmt::Debug for StartupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartupFailure")
            .field("error", &self.error)
            .field("acquired", &self.service.acquired)
            .finish()
    }
}

impl fmt::Display for StartupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "startup failed: {}", self.error)
    }
}

impl std::error::Error for StartupFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// The running imagery service and the dependencies it owns.
pub struct Service {
    /// Acquisition flags.
    pub acquired: Acquired,
    config: Arc<ServiceConfig>,
    listener: Option<Arc<dyn Listener>>,
    store: Option<Arc<dyn DataStore>>,
    permissions: Option<Arc<dyn Checker>>,
    uploaded: Option<Arc<dyn Producer>>,
    published: Option<Arc<dyn Producer>>,
    health: Option<Arc<dyn HealthMonitor>>,
    images: Option<Arc<Images>>,
}

impl Service {
    fn empty(config: ServiceConfig) -> Self {
        Self {
            acquired: Acquired::default(),
            config: Arc::new(config),
            listener: None,
            store: None,
            permissions: None,
            uploaded: None,
            published: None,
            health: None,
            images: None,
        }
    }

    /// Acquire every dependency and start serving.
    ///
    /// Listener errors after startup are sent on `errors`.
    ///
    /// # Errors
    ///
    /// Returns a [`StartupFailure`] carrying the error and the partially
    /// started service. Check registration failures are collected and
    /// reported together after every check has been attempted.
    pub async fn run(
        config: ServiceConfig,
        init: &dyn Initialiser,
        errors: mpsc::Sender<ServiceError>,
    ) -> Result<Self, Box<StartupFailure>> {
        let mut service = Self::empty(config);
        match service.start(init, errors).await {
            Ok(()) => Ok(service),
            Err(error) => {
                tracing::error!(error = %error, acquired = ?service.acquired, "Startup failed");
                Err(Box::new(StartupFailure { error, service }))
            }
        }
    }

    async fn start(
        &mut self,
        init: &dyn Initialiser,
        errors: mpsc::Sender<ServiceError>,
    ) -> Result<(), ServiceError> {
        let config = Arc::clone(&self.config);

        let listener = init.listener(&config.bind_addr);
        self.listener = Some(Arc::clone(&listener));

        let store = init
            .store(&config)
            .await
            .map_err(acquire(Dependency::Store))?;
        self.store = Some(Arc::clone(&store));
        self.acquired.store = true;
        tracing::info!("Store acquired");

        if config.publishing {
            let permissions = init
                .permissions_client(&config.permissions_api_url)
                .await
                .map_err(acquire(Dependency::Permissions))?;
            self.permissions = Some(permissions);
            self.acquired.permissions = true;
            tracing::info!(url = %config.permissions_api_url, "Permissions client acquired");

            let uploaded = init
                .producer(&config, &config.image_uploaded_topic)
                .await
                .map_err(acquire(Dependency::UploadedProducer))?;
            uploaded.log_errors();
            self.uploaded = Some(uploaded);
            self.acquired.uploaded_producer = true;
            tracing::info!(topic = %config.image_uploaded_topic, "Uploaded producer acquired");

            let published = init
                .producer(&config, &config.static_file_published_topic)
                .await
                .map_err(acquire(Dependency::PublishedProducer))?;
            published.log_errors();
            self.published = Some(published);
            self.acquired.published_producer = true;
            tracing::info!(topic = %config.static_file_published_topic, "Published producer acquired");
        }

        let health = init
            .health_monitor(&config)
            .map_err(acquire(Dependency::HealthMonitor))?;
        self.health = Some(Arc::clone(&health));
        self.acquired.health_monitor = true;
        tracing::info!("Health monitor acquired");

        self.register_checks(health.as_ref())?;

        let images = Arc::new(ImageService::new(
            store,
            self.uploaded.clone(),
            self.published.clone(),
            config.control_config(),
        ));
        self.images = Some(Arc::clone(&images));

        let router = create_router(AppState::new(images, Arc::clone(&health), config));
        health.start();

        let serving = Arc::clone(&listener);
        tokio::spawn(async move {
            if let Err(e) = serving.listen_and_serve(router).await {
                tracing::error!(error = %e, "Listener failed");
                let _ = errors.send(ServiceError::Listener(e)).await;
            }
        });
        self.acquired.listener = true;

        tracing::info!(acquired = ?self.acquired, "Service started");
        Ok(())
    }

    fn register_checks(&self, health: &dyn HealthMonitor) -> Result<(), ServiceError> {
        let mut candidates: Vec<(&str, Arc<dyn Checker>)> = Vec::new();

        if let Some(store) = self.store.as_ref().filter(|_| self.acquired.store) {
            candidates.push((checks::STORE, CheckerRef::shared(store)));
        }
        if self.config.publishing {
            if let Some(p) = self.uploaded.as_ref().filter(|_| self.acquired.uploaded_producer) {
                candidates.push((checks::UPLOADED_PRODUCER, CheckerRef::shared(p)));
            }
            if let Some(p) = self.published.as_ref().filter(|_| self.acquired.published_producer) {
                candidates.push((checks::PUBLISHED_PRODUCER, CheckerRef::shared(p)));
            }
            if let Some(p) = self.permissions.as_ref().filter(|_| self.acquired.permissions) {
                candidates.push((checks::PERMISSIONS, Arc::clone(p)));
            }
        }

        let failures: Vec<_> = candidates
            .into_iter()
            .filter_map(|(name, checker)| {
                health.add_check(name, checker).err().inspect(|e| {
                    tracing::error!(check = %name, error = %e, "Failed to register health check");
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::RegisterChecks(failures))
        }
    }

    /// The service configuration.
    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// The image service, once startup has completed.
    #[must_use]
    pub fn images(&self) -> Option<&Arc<Images>> {
        self.images.as_ref()
    }

    /// Release every acquired dependency, waiting at most `timeout`.
    ///
    /// The release steps run in a background task that carries on past the
    /// deadline if a dependency hangs.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::ShutdownTimeout` if the deadline passes first,
    /// or `ServiceError::Shutdown` listing every step that failed.
    pub async fn close(self, timeout: Duration) -> Result<(), ServiceError> {
        let deadline = Instant::now() + timeout;
        let (done_tx, done_rx) = oneshot::channel();

        tokio::spawn(async move {
            let failures = self.release(deadline).await;
            let _ = done_tx.send(failures);
        });

        match tokio::time::timeout_at(deadline, done_rx).await {
            Err(_) => {
                tracing::error!(timeout = ?timeout, "Shutdown timed out");
                Err(ServiceError::ShutdownTimeout)
            }
            Ok(Err(_)) => Err(ServiceError::ShutdownAborted),
            Ok(Ok(failures)) if failures.is_empty() => {
                tracing::info!("Service shut down gracefully");
                Ok(())
            }
            Ok(Ok(failures)) => Err(ServiceError::Shutdown(failures)),
        }
    }

    async fn release(self, deadline: Instant) -> Vec<ReleaseFailure> {
        let mut failures = Vec::new();
        let mut record = |dependency: Dependency, result: Result<(), DependencyError>| {
            if let Err(source) = result {
                tracing::error!(dependency = %dependency, error = %source, "Failed to release");
                failures.push(ReleaseFailure { dependency, source });
            }
        };

        if let Some(health) = self.health.as_ref().filter(|_| self.acquired.health_monitor) {
            health.stop();
        }

        if let Some(listener) = self.listener.as_ref().filter(|_| self.acquired.listener) {
            let budget = deadline.saturating_duration_since(Instant::now());
            record(Dependency::Listener, listener.shutdown(budget).await);
        }

        if let Some(images) = &self.images {
            let result = images
                .close()
                .await
                .map_err(|e| DependencyError::Unavailable(e.to_string()));
            record(Dependency::ImageService, result);
        }

        if let Some(store) = self.store.as_ref().filter(|_| self.acquired.store) {
            record(Dependency::Store, store.close().await);
        }

        if let Some(p) = self.uploaded.as_ref().filter(|_| self.acquired.uploaded_producer) {
            record(Dependency::UploadedProducer, p.close().await);
        }

        if let Some(p) = self.published.as_ref().filter(|_| self.acquired.published_producer) {
            record(Dependency::PublishedProducer, p.close().await);
        }

        failures
    }
}

fn acquire(dependency: Dependency) -> impl FnOnce(DependencyError) -> ServiceError {
    move |source| ServiceError::Acquire { dependency, source }
}
