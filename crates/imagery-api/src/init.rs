//! Dependency construction.
//!
//! [`Service::run`](crate::service::Service::run) acquires every dependency
//! through an [`Initialiser`], so tests can hand it failing or hanging fakes.

use std::sync::Arc;

use async_trait::async_trait;
use imagery_store::RocksStore;

use crate::config::ServiceConfig;
use crate::dependencies::{Checker, DataStore, HealthMonitor, Listener, Producer};
use crate::error::DependencyError;
use crate::health::HealthRegistry;
use crate::permissions::PermissionsClient;
use crate::producer::RestProducer;
use crate::server::HttpServer;
use crate::store::StoreHandle;

/// Builds the service's dependencies.
#[async_trait]
pub trait Initialiser: Send + Sync {
    /// Create the HTTP listener for `addr`.
    fn listener(&self, addr: &str) -> Arc<dyn Listener>;

    /// Open the document store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    async fn store(&self, config: &ServiceConfig) -> Result<Arc<dyn DataStore>, DependencyError>;

    /// Create the permissions API health client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    async fn permissions_client(&self, url: &str) -> Result<Arc<dyn Checker>, DependencyError>;

    /// Connect a producer for `topic`.
    ///
    /// # Errors
    ///
    /// Returns an error if the broker or topic is unreachable.
    async fn producer(
        &self,
        config: &ServiceConfig,
        topic: &str,
    ) -> Result<Arc<dyn Producer>, DependencyError>;

    /// Create the health monitor.
    ///
    /// # Errors
    ///
    /// Returns an error if the monitor cannot be created.
    fn health_monitor(
        &self,
        config: &ServiceConfig,
    ) -> Result<Arc<dyn HealthMonitor>, DependencyError>;
}

/// Initialiser for the real external services.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalInit;

#[async_trait]
impl Initialiser for ExternalInit {
    fn listener(&self, addr: &str) -> Arc<dyn Listener> {
        Arc::new(HttpServer::new(addr))
    }

    async fn store(&self, config: &ServiceConfig) -> Result<Arc<dyn DataStore>, DependencyError> {
        tracing::info!(path = %config.data_dir, "Opening RocksDB store");
        let path = config.data_dir.clone();
        let store = tokio::task::spawn_blocking(move || RocksStore::open(path))
            .await
            .map_err(|e| DependencyError::Unavailable(format!("store open task failed: {e}")))??;
        Ok(Arc::new(StoreHandle::new(store)))
    }

    async fn permissions_client(&self, url: &str) -> Result<Arc<dyn Checker>, DependencyError> {
        Ok(Arc::new(PermissionsClient::new(url)?))
    }

    async fn producer(
        &self,
        config: &ServiceConfig,
        topic: &str,
    ) -> Result<Arc<dyn Producer>, DependencyError> {
        let producer =
            RestProducer::connect(&config.kafka_rest_url, topic, config.producer_queue_size)
                .await?;
        Ok(Arc::new(producer))
    }

    fn health_monitor(
        &self,
        config: &ServiceConfig,
    ) -> Result<Arc<dyn HealthMonitor>, DependencyError> {
        Ok(Arc::new(HealthRegistry::new(
            config.healthcheck_interval(),
            config.healthcheck_critical_timeout(),
        )))
    }
}
