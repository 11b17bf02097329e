//! Active health checking: one background prober task per backend under
//! observation.
//!
//! Each prober runs an immediate check on start, then loops on a fixed
//! interval: `GET /health` with a short timeout, falling back to `HEAD /`
//! if the backend has no health endpoint. `unhealthy_threshold` consecutive
//! failures flips the backend unhealthy; a single success clears it. The
//! Proxy Engine can also short-circuit this via [`HealthChecker::mark_unhealthy`]
//! when a forwarded request itself fails, rather than waiting for the next
//! probe tick.

use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::models::settings::HealthCheckSettings;

struct Probe {
    healthy: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Tracks liveness of every backend under active observation.
pub struct HealthChecker {
    config: HealthCheckSettings,
    client: reqwest::Client,
    probes: Mutex<HashMap<String, Probe>>,
}

impl HealthChecker {
    pub fn new(config: HealthCheckSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.probe_timeout_secs))
            .build()
            .expect("failed to build health-check http client");
        Self {
            config,
            client,
            probes: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a prober for `backend` if one isn't already running. Idempotent.
    pub fn start(self: &Arc<Self>, backend: &str) {
        let mut probes = self.probes.lock().unwrap();
        if probes.contains_key(backend) {
            return;
        }

        let healthy = Arc::new(AtomicBool::new(true));
        let backend_owned = backend.to_string();
        let this = self.clone();
        let healthy_for_task = healthy.clone();

        let handle = tokio::spawn(async move {
            this.probe_loop(backend_owned, healthy_for_task).await;
        });

        probes.insert(backend.to_string(), Probe { healthy, handle });
        info!("started health checker for backend {}", backend);
    }

    /// Stops the prober for `backend`. Idempotent.
    pub fn stop(&self, backend: &str) {
        if let Some(probe) = self.probes.lock().unwrap().remove(backend) {
            probe.handle.abort();
            info!("stopped health checker for backend {}", backend);
        }
    }

    /// Stops every running prober, used during graceful shutdown.
    pub fn stop_all(&self) {
        let mut probes = self.probes.lock().unwrap();
        for (backend, probe) in probes.drain() {
            probe.handle.abort();
            debug!("stopped health checker for backend {} (shutdown)", backend);
        }
    }

    /// Whether `backend` is currently considered healthy. Backends with no
    /// registered prober are assumed healthy (e.g. before the first route
    /// referencing them is loaded).
    pub fn is_healthy(&self, backend: &str) -> bool {
        self.probes
            .lock()
            .unwrap()
            .get(backend)
            .map(|p| p.healthy.load(Ordering::Relaxed))
            .unwrap_or(true)
    }

    /// Immediately marks `backend` unhealthy, callable from the Proxy Engine
    /// when a forwarded request exhausts its retries. Permissive policy: any
    /// engine-side failure marks the backend down without waiting for the
    /// next probe tick.
    pub fn mark_unhealthy(&self, backend: &str, reason: &str) {
        if let Some(probe) = self.probes.lock().unwrap().get(backend) {
            if probe.healthy.swap(false, Ordering::Relaxed) {
                warn!("backend {} marked unhealthy: {}", backend, reason);
            }
        }
    }

    async fn probe_loop(self: Arc<Self>, backend: String, healthy: Arc<AtomicBool>) {
        let mut consecutive_failures: u32 = 0;
        loop {
            let ok = self.probe_once(&backend).await;
            if ok {
                if !healthy.swap(true, Ordering::Relaxed) {
                    info!("backend {} recovered", backend);
                }
                consecutive_failures = 0;
            } else {
                consecutive_failures += 1;
                if consecutive_failures >= self.config.unhealthy_threshold
                    && healthy.swap(false, Ordering::Relaxed)
                {
                    warn!(
                        "backend {} unhealthy after {} consecutive failed probes",
                        backend, consecutive_failures
                    );
                }
            }
            tokio::time::sleep(Duration::from_secs(self.config.check_interval_secs)).await;
        }
    }

    async fn probe_once(&self, backend: &str) -> bool {
        let health_url = format!("{}/health", backend.trim_end_matches('/'));
        if let Ok(resp) = self.client.get(&health_url).send().await {
            let status = resp.status();
            if status.as_u16() < 500 || status.as_u16() == 404 {
                return true;
            }
        }

        match self.client.head(backend).send().await {
            Ok(resp) => resp.status().as_u16() < 500,
            Err(_) => false,
        }
    }
}
