//! Health check registry.
//!
//! Checks are evaluated together on a fixed interval. A failing check is
//! `WARNING` until it has been failing for the critical timeout, after which
//! it is `CRITICAL`. The overall status is the worst check status, and is
//! `WARNING` until the first evaluation has finished.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::dependencies::{Checker, HealthMonitor};
use crate::error::HealthError;

/// Health status of a check or of the whole service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    /// Healthy.
    Ok,
    /// Failing, or not yet evaluated.
    Warning,
    /// Failing for longer than the critical timeout.
    Critical,
}

/// Latest result of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckState {
    /// Check name.
    pub name: String,
    /// Current status.
    pub status: CheckStatus,
    /// Human-readable result.
    pub message: String,
    /// When the check last ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked: Option<DateTime<Utc>>,
    /// When the check last succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success: Option<DateTime<Utc>>,
    /// When the check last failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure: Option<DateTime<Utc>>,
}

/// Report of every registered check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: CheckStatus,
    /// Service version.
    pub version: &'static str,
    /// Per-check results, ordered by name.
    pub checks: Vec<CheckState>,
}

struct Entry {
    checker: Arc<dyn Checker>,
    state: CheckState,
    failing_since: Option<Instant>,
}

struct Inner {
    interval: Duration,
    critical_timeout: Duration,
    checks: RwLock<BTreeMap<String, Entry>>,
    evaluated: RwLock<bool>,
}

/// In-process health monitor.
pub struct HealthRegistry {
    inner: Arc<Inner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthRegistry {
    /// Create a registry evaluating every `interval`.
    #[must_use]
    pub fn new(interval: Duration, critical_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                // tokio intervals must be non-zero
                interval: interval.max(Duration::from_millis(1)),
                critical_timeout,
                checks: RwLock::new(BTreeMap::new()),
                evaluated: RwLock::new(false),
            }),
            task: Mutex::new(None),
        }
    }

    /// Run every check once and record the results.
    pub async fn evaluate(&self) {
        self.inner.evaluate().await;
    }

    /// Returns true if the evaluation loop is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Inner {
    async fn evaluate(&self) {
        let checkers: Vec<(String, Arc<dyn Checker>)> = self
            .checks
            .read()
            .iter()
            .map(|(name, entry)| (name.clone(), Arc::clone(&entry.checker)))
            .collect();

        let results = join_all(checkers.iter().map(|(_, checker)| checker.check())).await;

        let now = Instant::now();
        let wall = Utc::now();
        let mut checks = self.checks.write();
        for ((name, _), result) in checkers.iter().zip(results) {
            let Some(entry) = checks.get_mut(name) else {
                continue;
            };
            entry.state.last_checked = Some(wall);
            match result {
                Ok(()) => {
                    entry.failing_since = None;
                    entry.state.status = CheckStatus::Ok;
                    entry.state.message = format!("{name} is ok");
                    entry.state.last_success = Some(wall);
                }
                Err(e) => {
                    let since = *entry.failing_since.get_or_insert(now);
                    entry.state.status = if now.duration_since(since) >= self.critical_timeout {
                        CheckStatus::Critical
                    } else {
                        CheckStatus::Warning
                    };
                    entry.state.message = e.to_string();
                    entry.state.last_failure = Some(wall);
                    tracing::warn!(check = %name, status = ?entry.state.status, error = %e, "Health check failed");
                }
            }
        }
        drop(checks);

        *self.evaluated.write() = true;
    }

    fn snapshot(&self) -> HealthReport {
        let checks: Vec<CheckState> = self
            .checks
            .read()
            .values()
            .map(|entry| entry.state.clone())
            .collect();

        let status = if *self.evaluated.read() {
            checks
                .iter()
                .map(|c| c.status)
                .max()
                .unwrap_or(CheckStatus::Ok)
        } else {
            CheckStatus::Warning
        };

        HealthReport {
            status,
            version: env!("CARGO_PKG_VERSION"),
            checks,
        }
    }
}

impl HealthMonitor for HealthRegistry {
    fn add_check(&self, name: &str, checker: Arc<dyn Checker>) -> Result<(), HealthError> {
        if name.is_empty() {
            return Err(HealthError::EmptyName);
        }

        let mut checks = self.inner.checks.write();
        if checks.contains_key(name) {
            return Err(HealthError::DuplicateCheck(name.to_string()));
        }

        checks.insert(
            name.to_string(),
            Entry {
                checker,
                state: CheckState {
                    name: name.to_string(),
                    status: CheckStatus::Warning,
                    message: "not yet checked".to_string(),
                    last_checked: None,
                    last_success: None,
                    last_failure: None,
                },
                failing_since: None,
            },
        );
        tracing::debug!(check = %name, "Registered health check");
        Ok(())
    }

    fn start(&self) {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inner.evaluate().await;
            }
        }));
        tracing::info!(interval = ?self.inner.interval, "Health monitor started");
    }

    fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
            tracing::info!("Health monitor stopped");
        }
    }

    fn snapshot(&self) -> HealthReport {
        self.inner.snapshot()
    }
}

impl Drop for HealthRegistry {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DependencyError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Toggle(AtomicBool);

    #[async_trait]
    impl Checker for Toggle {
        async fn check(&self) -> Result<(), DependencyError> {
            if self.0.load(Ordering::SeqCst) {
                Ok(())
            } else {
                Err(DependencyError::Unavailable("down".into()))
            }
        }
    }

    fn toggle(healthy: bool) -> Arc<Toggle> {
        Arc::new(Toggle(AtomicBool::new(healthy)))
    }

    #[tokio::test]
    async fn warning_before_first_run() {
        let registry = HealthRegistry::new(Duration::from_secs(30), Duration::from_secs(90));
        registry.add_check("Store", toggle(true)).unwrap();

        let report = registry.snapshot();
        assert_eq!(report.status, CheckStatus::Warning);
        assert_eq!(report.checks[0].status, CheckStatus::Warning);
    }

    #[tokio::test]
    async fn healthy_checks_are_ok() {
        let registry = HealthRegistry::new(Duration::from_secs(30), Duration::from_secs(90));
        registry.add_check("Store", toggle(true)).unwrap();
        registry.add_check("Permissions API", toggle(true)).unwrap();

        registry.evaluate().await;

        let report = registry.snapshot();
        assert_eq!(report.status, CheckStatus::Ok);
        assert!(report.checks.iter().all(|c| c.last_success.is_some()));
    }

    #[tokio::test]
    async fn failure_escalates_to_critical() {
        let registry = HealthRegistry::new(Duration::from_secs(30), Duration::ZERO);
        registry.add_check("Store", toggle(true)).unwrap();
        registry.add_check("Uploaded Kafka Producer", toggle(false)).unwrap();

        registry.evaluate().await;

        let report = registry.snapshot();
        assert_eq!(report.status, CheckStatus::Critical);
        let store = report.checks.iter().find(|c| c.name == "Store").unwrap();
        assert_eq!(store.status, CheckStatus::Ok);
    }

    #[tokio::test]
    async fn recent_failure_is_warning() {
        let registry = HealthRegistry::new(Duration::from_secs(30), Duration::from_secs(90));
        let check = toggle(false);
        registry.add_check("Store", Arc::clone(&check) as Arc<dyn Checker>).unwrap();

        registry.evaluate().await;
        assert_eq!(registry.snapshot().status, CheckStatus::Warning);

        check.0.store(true, Ordering::SeqCst);
        registry.evaluate().await;
        assert_eq!(registry.snapshot().status, CheckStatus::Ok);
    }

    #[test]
    fn rejects_empty_and_duplicate_names() {
        let registry = HealthRegistry::new(Duration::from_secs(30), Duration::from_secs(90));
        assert_eq!(
            registry.add_check("", toggle(true)),
            Err(HealthError::EmptyName)
        );
        registry.add_check("Store", toggle(true)).unwrap();
        assert_eq!(
            registry.add_check("Store", toggle(true)),
            Err(HealthError::DuplicateCheck("Store".to_string()))
        );
    }

    #[tokio::test]
    async fn start_and_stop() {
        let registry = HealthRegistry::new(Duration::from_millis(10), Duration::from_secs(90));
        registry.add_check("Store", toggle(true)).unwrap();

        registry.start();
        assert!(registry.is_running());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(registry.snapshot().status, CheckStatus::Ok);

        registry.stop();
        assert!(!registry.is_running());
    }

    #[test]
    fn status_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&CheckStatus::Critical).unwrap(),
            "\"CRITICAL\""
        );
    }
}
