//! Connectivity monitor.
//!
//! A best-effort reachability heuristic. A positive probe does not promise
//! the remote authority itself is up; it only gates whether a pass should
//! try at all.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::config::ConnectivityConfig;
use crate::error::SyncError;

/// Online/offline signal.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// `true` if the network currently looks reachable. Never errors.
    async fn probe(&self) -> bool;
}

/// Probes a stable external endpoint with a bounded HEAD request.
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Build a probe from the connectivity settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &ConnectivityConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build probe client: {e}")))?;

        Ok(Self {
            client,
            url: config.probe_url.clone(),
        })
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn probe(&self) -> bool {
        // Any response at all means the network path works
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                debug!(url = %self.url, status = %response.status(), "Connectivity probe answered");
                true
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "Connectivity probe failed");
                false
            }
        }
    }
}

/// Connectivity driven by the host platform (or a test) instead of probing.
#[derive(Debug)]
pub struct ManualConnectivity {
    online: AtomicBool,
}

impl ManualConnectivity {
    #[must_use]
    pub const fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for ManualConnectivity {
    async fn probe(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn test_manual_connectivity() {
        let connectivity = ManualConnectivity::new(false);
        assert!(!connectivity.probe().await);
        connectivity.set_online(true);
        assert!(connectivity.probe().await);
    }

    #[tokio::test]
    async fn test_unreachable_probe_is_offline() {
        // Port 9 (discard) on loopback is closed in any sane test environment
        let config = ConnectivityConfig {
            probe_url: "http://127.0.0.1:9/".to_string(),
            timeout_secs: 2,
            ..ConnectivityConfig::default()
        };
        let probe = HttpProbe::new(&config).unwrap();

        let started = Instant::now();
        assert!(!probe.probe().await);
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_invalid_url_is_offline() {
        let config = ConnectivityConfig {
            probe_url: "not a url".to_string(),
            ..ConnectivityConfig::default()
        };
        let probe = HttpProbe::new(&config).unwrap();
        assert!(!probe.probe().await);
    }
}
