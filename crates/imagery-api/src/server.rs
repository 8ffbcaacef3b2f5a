//! HTTP listener.
//!
//! `HttpServer` binds its address when serving starts and shuts down
//! gracefully when signalled through a `watch` channel.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::dependencies::Listener;
use crate::error::DependencyError;

/// The production [`Listener`].
pub struct HttpServer {
    addr: String,
    local_addr: Mutex<Option<SocketAddr>>,
    shutdown: watch::Sender<bool>,
    stopped: watch::Sender<bool>,
}

impl HttpServer {
    /// Create a server for `addr`. Nothing is bound until serving starts.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (stopped, _) = watch::channel(false);
        Self {
            addr: addr.into(),
            local_addr: Mutex::new(None),
            shutdown,
            stopped,
        }
    }

    /// The configured address.
    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// The bound address, once serving.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    async fn serve(&self, router: Router) -> Result<(), DependencyError> {
        let listener = TcpListener::bind(&self.addr).await?;
        let local_addr = listener.local_addr()?;
        *self.local_addr.lock() = Some(local_addr);
        tracing::info!(addr = %local_addr, "HTTP server listening");

        let mut shutdown = self.shutdown.subscribe();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[async_trait]
impl Listener for HttpServer {
    async fn listen_and_serve(&self, router: Router) -> Result<(), DependencyError> {
        let result = self.serve(router).await;
        self.stopped.send_replace(true);
        result
    }

    async fn shutdown(&self, budget: Duration) -> Result<(), DependencyError> {
        self.shutdown.send_replace(true);

        let mut stopped = self.stopped.subscribe();
        let waited = tokio::time::timeout(budget, async move {
            let _ = stopped.wait_for(|done| *done).await;
        })
        .await;

        if waited.is_err() {
            tracing::warn!(budget = ?budget, "HTTP server did not drain in time");
            return Err(DependencyError::Timeout);
        }
        Ok(())
    }
}
