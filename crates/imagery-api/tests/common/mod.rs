//! Fake dependencies for service lifecycle tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use tokio::sync::Notify;

use imagery_api::{
    Checker, DataStore, DependencyError, HealthError, HealthMonitor, HealthReport, Initialiser,
    Listener, Producer, ServiceConfig, StoreHandle,
};
use imagery_api::CheckStatus;
use imagery_control::EventProducer;
use imagery_core::{CollectionId, ImageId};
use imagery_store::{Image, MemoryStore, Store};

/// How a fake release call behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Release {
    #[default]
    Succeed,
    Fail,
    Hang,
}

impl Release {
    async fn run(self, what: &str) -> Result<(), DependencyError> {
        match self {
            Self::Succeed => Ok(()),
            Self::Fail => Err(DependencyError::Unavailable(format!("{what} failed"))),
            Self::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

/// Counts every call made to the fakes.
#[derive(Debug, Default)]
pub struct Calls {
    pub listener_shutdown: AtomicUsize,
    pub store_close: AtomicUsize,
    pub producer_close: AtomicUsize,
    pub health_stop: AtomicUsize,
    pub health_start: AtomicUsize,
    pub producers_created: AtomicUsize,
    pub permissions_created: AtomicUsize,
    pub health_created: AtomicUsize,
    pub add_check: AtomicUsize,
}

impl Calls {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

pub struct FakeListener {
    calls: Arc<Calls>,
    release: Release,
    fail_serve: bool,
    stop: Notify,
}

#[async_trait]
impl Listener for FakeListener {
    async fn listen_and_serve(&self, _router: Router) -> Result<(), DependencyError> {
        if self.fail_serve {
            return Err(DependencyError::Unavailable("address in use".into()));
        }
        self.stop.notified().await;
        Ok(())
    }

    async fn shutdown(&self, _budget: Duration) -> Result<(), DependencyError> {
        bump(&self.calls.listener_shutdown);
        self.stop.notify_one();
        self.release.run("listener").await
    }
}

pub struct FakeStore {
    inner: StoreHandle<MemoryStore>,
    calls: Arc<Calls>,
    release: Release,
}

impl Store for FakeStore {
    fn put_image(&self, image: &Image) -> imagery_store::Result<()> {
        self.inner.put_image(image)
    }

    fn get_image(&self, image_id: &ImageId) -> imagery_store::Result<Option<Image>> {
        self.inner.get_image(image_id)
    }

    fn list_images(&self) -> imagery_store::Result<Vec<Image>> {
        self.inner.list_images()
    }

    fn list_images_by_collection(
        &self,
        collection_id: &CollectionId,
    ) -> imagery_store::Result<Vec<Image>> {
        self.inner.list_images_by_collection(collection_id)
    }

    fn health(&self) -> imagery_store::Result<()> {
        self.inner.health()
    }

    fn flush(&self) -> imagery_store::Result<()> {
        self.inner.flush()
    }
}

#[async_trait]
impl Checker for FakeStore {
    async fn check(&self) -> Result<(), DependencyError> {
        self.inner.check().await
    }
}

#[async_trait]
impl DataStore for FakeStore {
    async fn close(&self) -> Result<(), DependencyError> {
        bump(&self.calls.store_close);
        self.release.run("store").await
    }
}

pub struct FakeProducer {
    calls: Arc<Calls>,
    release: Release,
    pub sent: Mutex<Vec<Vec<u8>>>,
}

impl FakeProducer {
    pub fn new() -> Self {
        Self {
            calls: Arc::default(),
            release: Release::Succeed,
            sent: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl EventProducer for FakeProducer {
    async fn send(&self, payload: Vec<u8>) -> imagery_control::Result<()> {
        self.sent.lock().push(payload);
        Ok(())
    }
}

#[async_trait]
impl Checker for FakeProducer {
    async fn check(&self) -> Result<(), DependencyError> {
        Ok(())
    }
}

#[async_trait]
impl Producer for FakeProducer {
    async fn close(&self) -> Result<(), DependencyError> {
        bump(&self.calls.producer_close);
        self.release.run("producer").await
    }

    fn log_errors(&self) {}
}

struct AlwaysOk;

#[async_trait]
impl Checker for AlwaysOk {
    async fn check(&self) -> Result<(), DependencyError> {
        Ok(())
    }
}

pub struct FakeHealth {
    calls: Arc<Calls>,
    reject: Vec<String>,
    pub names: Mutex<Vec<String>>,
}

impl HealthMonitor for FakeHealth {
    fn add_check(&self, name: &str, _checker: Arc<dyn Checker>) -> Result<(), HealthError> {
        bump(&self.calls.add_check);
        if self.reject.iter().any(|r| r == name) {
            return Err(HealthError::Rejected {
                name: name.to_string(),
                reason: "rejected by test".to_string(),
            });
        }
        self.names.lock().push(name.to_string());
        Ok(())
    }

    fn start(&self) {
        bump(&self.calls.health_start);
    }

    fn stop(&self) {
        bump(&self.calls.health_stop);
    }

    fn snapshot(&self) -> HealthReport {
        HealthReport {
            status: CheckStatus::Ok,
            version: "test",
            checks: Vec::new(),
        }
    }
}

/// Scripted initialiser.
#[derive(Default)]
pub struct FakeInit {
    pub calls: Arc<Calls>,
    pub fail_store: bool,
    pub fail_published_producer: bool,
    pub fail_serve: bool,
    pub reject_checks: Vec<String>,
    pub listener_release: Release,
    pub store_release: Release,
    pub producer_release: Release,
    pub health: Mutex<Option<Arc<FakeHealth>>>,
}

impl FakeInit {
    pub fn registered_checks(&self) -> Vec<String> {
        self.health
            .lock()
            .as_ref()
            .map(|h| h.names.lock().clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Initialiser for FakeInit {
    fn listener(&self, _addr: &str) -> Arc<dyn Listener> {
        Arc::new(FakeListener {
            calls: Arc::clone(&self.calls),
            release: self.listener_release,
            fail_serve: self.fail_serve,
            stop: Notify::new(),
        })
    }

    async fn store(&self, _config: &ServiceConfig) -> Result<Arc<dyn DataStore>, DependencyError> {
        if self.fail_store {
            return Err(DependencyError::Unavailable("store unreachable".into()));
        }
        Ok(Arc::new(FakeStore {
            inner: StoreHandle::new(MemoryStore::new()),
            calls: Arc::clone(&self.calls),
            release: self.store_release,
        }))
    }

    async fn permissions_client(&self, _url: &str) -> Result<Arc<dyn Checker>, DependencyError> {
        bump(&self.calls.permissions_created);
        Ok(Arc::new(AlwaysOk))
    }

    async fn producer(
        &self,
        config: &ServiceConfig,
        topic: &str,
    ) -> Result<Arc<dyn Producer>, DependencyError> {
        bump(&self.calls.producers_created);
        if self.fail_published_producer && topic == config.static_file_published_topic {
            return Err(DependencyError::Unavailable("broker unreachable".into()));
        }
        Ok(Arc::new(FakeProducer {
            calls: Arc::clone(&self.calls),
            release: self.producer_release,
            sent: Mutex::new(Vec::new()),
        }))
    }

    fn health_monitor(
        &self,
        _config: &ServiceConfig,
    ) -> Result<Arc<dyn HealthMonitor>, DependencyError> {
        bump(&self.calls.health_created);
        let health = Arc::new(FakeHealth {
            calls: Arc::clone(&self.calls),
            reject: self.reject_checks.clone(),
            names: Mutex::new(Vec::new()),
        });
        *self.health.lock() = Some(Arc::clone(&health));
        Ok(health)
    }
}

pub fn publishing_config() -> ServiceConfig {
    ServiceConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        ..ServiceConfig::default()
    }
}
