//! Imagery - image metadata service
//!
//! This is the main entry point. Configuration comes from the environment
//! (see [`ServiceConfig::from_env`]).
//!
//! # Modes
//!
//! Set `IS_PUBLISHING=false` to run a web instance: read-only routes that
//! only expose published images, with no broker producers.

use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use imagery_api::{ExternalInit, Service, ServiceConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,imagery=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting imagery");

    let config = ServiceConfig::from_env();
    let shutdown_timeout = config.graceful_shutdown_timeout();

    tracing::info!(
        bind_addr = %config.bind_addr,
        data_dir = %config.data_dir,
        publishing = config.publishing,
        kafka_rest_url = %config.kafka_rest_url,
        "Configuration loaded"
    );

    let (errors_tx, mut errors_rx) = mpsc::channel(1);

    let service = match Service::run(config, &ExternalInit, errors_tx).await {
        Ok(service) => service,
        Err(failure) => {
            let failure = *failure;
            if let Err(e) = failure.service.close(shutdown_timeout).await {
                tracing::error!(error = %e, "Failed to release partially started service");
            }
            return Err(failure.error.into());
        }
    };

    let server_error = tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown signal received");
            None
        }
        Some(e) = errors_rx.recv() => {
            tracing::error!(error = %e, "Server error");
            Some(e)
        }
    };

    service.close(shutdown_timeout).await?;

    match server_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}
