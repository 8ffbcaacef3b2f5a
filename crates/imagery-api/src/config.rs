//! Service configuration types.
//!
//! The configuration is built once by the binary (from the environment) and
//! passed by reference to everything that needs it.

use std::time::Duration;

use imagery_control::{ControlConfig, UrlTemplates};
use serde::Deserialize;

/// Configuration for the imagery service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Listen address (e.g., "0.0.0.0:24700").
    #[serde(default = "ServiceConfig::default_bind_addr")]
    pub bind_addr: String,

    /// `RocksDB` data directory.
    #[serde(default = "ServiceConfig::default_data_dir")]
    pub data_dir: String,

    /// Whether this is a publishing instance.
    ///
    /// Publishing instances accept writes and emit broker messages; web
    /// instances serve published images only.
    #[serde(default = "ServiceConfig::default_publishing")]
    pub publishing: bool,

    /// Base URL of the Kafka REST proxy.
    #[serde(default = "ServiceConfig::default_kafka_rest_url")]
    pub kafka_rest_url: String,

    /// Topic for image-uploaded messages.
    #[serde(default = "ServiceConfig::default_uploaded_topic")]
    pub image_uploaded_topic: String,

    /// Topic for static-file-published messages.
    #[serde(default = "ServiceConfig::default_published_topic")]
    pub static_file_published_topic: String,

    /// Maximum number of messages queued per producer.
    #[serde(default = "ServiceConfig::default_producer_queue")]
    pub producer_queue_size: usize,

    /// Base URL of the permissions API.
    #[serde(default = "ServiceConfig::default_permissions_url")]
    pub permissions_api_url: String,

    /// Download link templates.
    #[serde(default)]
    pub url_templates: UrlTemplates,

    /// Allowed CORS origins.
    #[serde(default = "ServiceConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Time allowed for a graceful shutdown, in seconds.
    #[serde(default = "ServiceConfig::default_shutdown_timeout")]
    pub graceful_shutdown_timeout_seconds: u64,

    /// Interval between health check runs, in seconds.
    #[serde(default = "ServiceConfig::default_healthcheck_interval")]
    pub healthcheck_interval_seconds: u64,

    /// How long a check may fail before it is critical, in seconds.
    #[serde(default = "ServiceConfig::default_healthcheck_critical")]
    pub healthcheck_critical_timeout_seconds: u64,

    /// Maximum request body size in bytes.
    #[serde(default = "ServiceConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "ServiceConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    fn default_bind_addr() -> String {
        "0.0.0.0:24700".to_string()
    }

    fn default_data_dir() -> String {
        "/data/imagery".to_string()
    }

    const fn default_publishing() -> bool {
        true
    }

    fn default_kafka_rest_url() -> String {
        "http://localhost:8082".to_string()
    }

    fn default_uploaded_topic() -> String {
        "image-uploaded".to_string()
    }

    fn default_published_topic() -> String {
        "static-file-published".to_string()
    }

    const fn default_producer_queue() -> usize {
        256
    }

    fn default_permissions_url() -> String {
        "http://localhost:25400".to_string()
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_shutdown_timeout() -> u64 {
        5
    }

    const fn default_healthcheck_interval() -> u64 {
        30
    }

    const fn default_healthcheck_critical() -> u64 {
        90
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Create configuration from environment variables.
    ///
    /// Unset variables keep their defaults; numeric variables that fail to
    /// parse are ignored with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("BIND_ADDR") {
            config.bind_addr = val;
        }
        if let Some(val) = lookup("DATA_DIR") {
            config.data_dir = val;
        }
        if let Some(val) = lookup("IS_PUBLISHING") {
            config.publishing = match val.to_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    tracing::warn!(value = %val, "Ignoring invalid IS_PUBLISHING");
                    config.publishing
                }
            };
        }
        if let Some(val) = lookup("KAFKA_REST_URL") {
            config.kafka_rest_url = val;
        }
        if let Some(val) = lookup("IMAGE_UPLOADED_TOPIC") {
            config.image_uploaded_topic = val;
        }
        if let Some(val) = lookup("STATIC_FILE_PUBLISHED_TOPIC") {
            config.static_file_published_topic = val;
        }
        if let Some(val) = lookup("PERMISSIONS_API_URL") {
            config.permissions_api_url = val;
        }
        if let Some(val) = lookup("PUBLIC_URL_TEMPLATE") {
            config.url_templates.public = val;
        }
        if let Some(val) = lookup("PRIVATE_URL_TEMPLATE") {
            config.url_templates.private = val;
        }
        if let Some(val) = lookup("CORS_ORIGINS") {
            config.cors_origins = val.split(',').map(|o| o.trim().to_string()).collect();
        }

        parse_into(&lookup, "PRODUCER_QUEUE_SIZE", &mut config.producer_queue_size);
        parse_into(
            &lookup,
            "GRACEFUL_SHUTDOWN_TIMEOUT",
            &mut config.graceful_shutdown_timeout_seconds,
        );
        parse_into(
            &lookup,
            "HEALTHCHECK_INTERVAL",
            &mut config.healthcheck_interval_seconds,
        );
        parse_into(
            &lookup,
            "HEALTHCHECK_CRITICAL_TIMEOUT",
            &mut config.healthcheck_critical_timeout_seconds,
        );
        parse_into(&lookup, "MAX_BODY_BYTES", &mut config.max_body_bytes);
        parse_into(&lookup, "REQUEST_TIMEOUT", &mut config.request_timeout_seconds);

        config
    }

    /// Configuration for the image request service.
    #[must_use]
    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            publishing: self.publishing,
            url_templates: self.url_templates.clone(),
        }
    }

    /// Get the graceful shutdown timeout as a `Duration`.
    #[must_use]
    pub const fn graceful_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_shutdown_timeout_seconds)
    }

    /// Get the health check interval as a `Duration`.
    #[must_use]
    pub const fn healthcheck_interval(&self) -> Duration {
        Duration::from_secs(self.healthcheck_interval_seconds)
    }

    /// Get the health check critical timeout as a `Duration`.
    #[must_use]
    pub const fn healthcheck_critical_timeout(&self) -> Duration {
        Duration::from_secs(self.healthcheck_critical_timeout_seconds)
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: Self::default_bind_addr(),
            data_dir: Self::default_data_dir(),
            publishing: Self::default_publishing(),
            kafka_rest_url: Self::default_kafka_rest_url(),
            image_uploaded_topic: Self::default_uploaded_topic(),
            static_file_published_topic: Self::default_published_topic(),
            producer_queue_size: Self::default_producer_queue(),
            permissions_api_url: Self::default_permissions_url(),
            url_templates: UrlTemplates::default(),
            cors_origins: Self::default_cors_origins(),
            graceful_shutdown_timeout_seconds: Self::default_shutdown_timeout(),
            healthcheck_interval_seconds: Self::default_healthcheck_interval(),
            healthcheck_critical_timeout_seconds: Self::default_healthcheck_critical(),
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

fn parse_into<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(val) = lookup(key) {
        match val.parse() {
            Ok(n) => *target = n,
            Err(_) => tracing::warn!(key, value = %val, "Ignoring invalid numeric setting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:24700");
        assert!(config.publishing);
        assert_eq!(config.image_uploaded_topic, "image-uploaded");
        assert_eq!(config.static_file_published_topic, "static-file-published");
        assert_eq!(config.graceful_shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.healthcheck_interval(), Duration::from_secs(30));
        assert_eq!(config.healthcheck_critical_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("BIND_ADDR", "127.0.0.1:9999"),
            ("IS_PUBLISHING", "false"),
            ("GRACEFUL_SHUTDOWN_TIMEOUT", "12"),
            ("PUBLIC_URL_TEMPLATE", "https://cdn/{id}/{variant}/{filename}"),
        ]));

        assert_eq!(config.bind_addr, "127.0.0.1:9999");
        assert!(!config.publishing);
        assert_eq!(config.graceful_shutdown_timeout_seconds, 12);
        assert_eq!(
            config.control_config().url_templates.public,
            "https://cdn/{id}/{variant}/{filename}"
        );
        assert!(!config.control_config().publishing);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("HEALTHCHECK_INTERVAL", "soon"),
            ("IS_PUBLISHING", "maybe"),
        ]));

        assert_eq!(config.healthcheck_interval_seconds, 30);
        assert!(config.publishing);
    }
}
