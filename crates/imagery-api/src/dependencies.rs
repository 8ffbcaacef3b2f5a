//! Contracts for the dependencies the service acquires and releases.
//!
//! The service only talks to these traits; production implementations live
//! in [`crate::server`], [`crate::producer`], [`crate::permissions`],
//! [`crate::store`] and [`crate::health`], and tests substitute their own.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;

use imagery_control::EventProducer;
use imagery_store::Store;

use crate::error::{DependencyError, HealthError};
use crate::health::HealthReport;

/// A probe run periodically by the health monitor.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Probe the dependency once.
    ///
    /// # Errors
    ///
    /// Returns the failure if the dependency is unhealthy.
    async fn check(&self) -> Result<(), DependencyError>;
}

/// The network listener serving the HTTP API.
#[async_trait]
pub trait Listener: Send + Sync {
    /// Bind and serve `router` until shut down. Blocks for the lifetime of the server.
    ///
    /// # Errors
    ///
    /// Returns an error if binding or serving fails.
    async fn listen_and_serve(&self, router: Router) -> Result<(), DependencyError>;

    /// Stop accepting connections and wait up to `budget` for in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns `DependencyError::Timeout` if the server did not stop in time.
    async fn shutdown(&self, budget: Duration) -> Result<(), DependencyError>;
}

/// The document store handle.
#[async_trait]
pub trait DataStore: Store + Checker {
    /// Release the store, flushing pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    async fn close(&self) -> Result<(), DependencyError>;
}

/// A broker producer bound to one topic.
#[async_trait]
pub trait Producer: EventProducer + Checker {
    /// Deliver queued messages and release the producer.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery could not be completed.
    async fn close(&self) -> Result<(), DependencyError>;

    /// Start surfacing delivery errors in the background.
    fn log_errors(&self);
}

/// Periodic health evaluation of registered checks.
pub trait HealthMonitor: Send + Sync {
    /// Register a named check.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or already registered.
    fn add_check(&self, name: &str, checker: Arc<dyn Checker>) -> Result<(), HealthError>;

    /// Start periodic evaluation.
    fn start(&self);

    /// Stop periodic evaluation.
    fn stop(&self);

    /// Current report of every check.
    fn snapshot(&self) -> HealthReport;
}

/// Exposes any shared checker (including trait objects such as
/// `dyn DataStore`) as an `Arc<dyn Checker>`.
pub struct CheckerRef<T: ?Sized>(pub Arc<T>);

#[async_trait]
impl<T: Checker + ?Sized> Checker for CheckerRef<T> {
    async fn check(&self) -> Result<(), DependencyError> {
        self.0.check().await
    }
}

impl<T: Checker + ?Sized + 'static> CheckerRef<T> {
    /// Wrap a shared checker.
    #[must_use]
    pub fn shared(inner: &Arc<T>) -> Arc<dyn Checker> {
        Arc::new(Self(Arc::clone(inner)))
    }
}
