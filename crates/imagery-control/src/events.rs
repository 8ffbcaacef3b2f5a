//! Broker messages emitted by image requests.
//!
//! Messages are encoded as CBOR and handed to an [`EventProducer`] as an
//! opaque payload; the producer owns delivery.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{ControlError, Result};

/// Sends encoded messages to a single broker topic.
#[async_trait]
pub trait EventProducer: Send + Sync {
    /// Queue a payload for delivery.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Producer` if the payload cannot be accepted.
    async fn send(&self, payload: Vec<u8>) -> Result<()>;
}

/// Emitted when an image's source file has been uploaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUploaded {
    /// The uploaded image.
    pub image_id: String,
    /// Path of the source file in upload storage.
    pub path: String,
}

/// Emitted for each imported download when its image is published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePublished {
    /// The image being published.
    pub image_id: String,
    /// The download variant being published.
    pub image_variant: String,
    /// Path of the variant in private storage.
    pub src_path: String,
    /// Destination path in the public bucket.
    pub dst_path: String,
}

/// Encode a message as CBOR.
///
/// # Errors
///
/// Returns `ControlError::Producer` if serialization fails.
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| ControlError::Producer(e.to_string()))?;
    Ok(buf)
}

/// Decode a CBOR message.
///
/// # Errors
///
/// Returns `ControlError::Producer` if the payload is not a valid message.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    ciborium::from_reader(payload).map_err(|e| ControlError::Producer(e.to_string()))
}
