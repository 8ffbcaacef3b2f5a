//! Broker producer over the Kafka REST proxy.
//!
//! Messages are queued on a bounded channel and delivered by a background
//! task as `application/vnd.kafka.binary.v2+json` records with base64 values.
//! Delivery failures go to an error channel that [`Producer::log_errors`]
//! drains into the log.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use imagery_control::{ControlError, EventProducer};

use crate::dependencies::{Checker, Producer};
use crate::error::DependencyError;

const CONTENT_TYPE: &str = "application/vnd.kafka.binary.v2+json";
const ERROR_BUFFER: usize = 64;

#[derive(Debug, Serialize)]
struct Records {
    records: Vec<Record>,
}

#[derive(Debug, Serialize)]
struct Record {
    value: String,
}

/// Producer for one topic on a Kafka REST proxy.
pub struct RestProducer {
    client: reqwest::Client,
    topic_url: String,
    queue: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    errors: Mutex<Option<mpsc::Receiver<DependencyError>>>,
}

impl RestProducer {
    /// Connect to `topic` on the proxy at `base_url`.
    ///
    /// The topic must exist; the delivery task is started immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or the topic is not
    /// reachable.
    pub async fn connect(
        base_url: &str,
        topic: &str,
        queue_size: usize,
    ) -> Result<Self, DependencyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        let topic_url = format!("{}/topics/{topic}", base_url.trim_end_matches('/'));

        probe(&client, &topic_url).await?;

        let (queue_tx, queue_rx) = mpsc::channel(queue_size.max(1));
        let (error_tx, error_rx) = mpsc::channel(ERROR_BUFFER);
        let worker = tokio::spawn(deliver(
            client.clone(),
            topic_url.clone(),
            queue_rx,
            error_tx,
        ));

        tracing::info!(topic_url = %topic_url, "Producer connected");

        Ok(Self {
            client,
            topic_url,
            queue: Mutex::new(Some(queue_tx)),
            worker: Mutex::new(Some(worker)),
            errors: Mutex::new(Some(error_rx)),
        })
    }

    /// The URL records are posted to.
    #[must_use]
    pub fn topic_url(&self) -> &str {
        &self.topic_url
    }

    /// Take the delivery error channel, if [`Producer::log_errors`] has not
    /// already claimed it.
    pub fn take_errors(&self) -> Option<mpsc::Receiver<DependencyError>> {
        self.errors.lock().take()
    }
}

async fn probe(client: &reqwest::Client, url: &str) -> Result<(), DependencyError> {
    let response = client.get(url).send().await?;
    if response.status().is_success() {
        Ok(())
    } else {
        Err(DependencyError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        })
    }
}

async fn post_record(
    client: &reqwest::Client,
    url: &str,
    payload: &[u8],
) -> Result<(), DependencyError> {
    let body = Records {
        records: vec![Record {
            value: STANDARD.encode(payload),
        }],
    };
    let response = client
        .post(url)
        .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
        .json(&body)
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(DependencyError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        })
    }
}

async fn deliver(
    client: reqwest::Client,
    url: String,
    mut queue: mpsc::Receiver<Vec<u8>>,
    errors: mpsc::Sender<DependencyError>,
) {
    while let Some(payload) = queue.recv().await {
        if let Err(e) = post_record(&client, &url, &payload).await {
            if errors.try_send(e).is_err() {
                tracing::warn!(topic_url = %url, "Producer error buffer full, dropping error");
            }
        } else {
            tracing::debug!(topic_url = %url, bytes = payload.len(), "Delivered message");
        }
    }
}

#[async_trait]
impl EventProducer for RestProducer {
    async fn send(&self, payload: Vec<u8>) -> imagery_control::Result<()> {
        let queue = self
            .queue
            .lock()
            .clone()
            .ok_or_else(|| ControlError::Producer("producer is closed".to_string()))?;

        queue
            .send(payload)
            .await
            .map_err(|_| ControlError::Producer("delivery task has stopped".to_string()))
    }
}

#[async_trait]
impl Checker for RestProducer {
    async fn check(&self) -> Result<(), DependencyError> {
        probe(&self.client, &self.topic_url).await
    }
}

#[async_trait]
impl Producer for RestProducer {
    async fn close(&self) -> Result<(), DependencyError> {
        // Dropping the sender lets the worker drain the queue and exit.
        drop(self.queue.lock().take());

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            worker
                .await
                .map_err(|e| DependencyError::Unavailable(format!("delivery task failed: {e}")))?;
        }

        tracing::info!(topic_url = %self.topic_url, "Producer closed");
        Ok(())
    }

    fn log_errors(&self) {
        let Some(mut errors) = self.take_errors() else {
            return;
        };
        let topic_url = self.topic_url.clone();
        tokio::spawn(async move {
            while let Some(e) = errors.recv().await {
                tracing::error!(topic_url = %topic_url, error = %e, "Failed to deliver message");
            }
        });
    }
}
