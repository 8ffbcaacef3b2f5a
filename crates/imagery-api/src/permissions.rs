//! Health client for the permissions API.

use std::time::Duration;

use async_trait::async_trait;

use crate::dependencies::Checker;
use crate::error::DependencyError;

/// Probes `GET {base_url}/health` on the permissions API.
#[derive(Debug, Clone)]
pub struct PermissionsClient {
    client: reqwest::Client,
    base_url: String,
}

impl PermissionsClient {
    /// Create a new permissions client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>) -> Result<Self, DependencyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    /// Create a new permissions client with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL of the permissions API.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Checker for PermissionsClient {
    async fn check(&self) -> Result<(), DependencyError> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DependencyError::Status {
                status: response.status().as_u16(),
                url,
            })
        }
    }
}
