//! Stats Sink: global and per-host request counters surfaced on
//! `GET /internal/stats`.
//!
//! Counters are plain atomics behind a sharded-by-host map; incrementing
//! them never blocks a forwarding path on lock contention beyond the brief
//! map lookup needed the first time a host is seen.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Default)]
struct HostCounters {
    total: AtomicU64,
    success: AtomicU64,
    failed: AtomicU64,
    last_request_unix_secs: AtomicU64,
}

/// Serializable snapshot of one host's counters, keyed by host in
/// [`StatsSnapshot::host_stats`].
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HostStats {
    pub requests: u64,
    pub success: u64,
    pub failed: u64,
    #[serde(rename = "lastRequest")]
    pub last_request: u64,
}

/// Serializable snapshot of the whole sink, as returned by
/// `GET /internal/stats`.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatsSnapshot {
    #[serde(rename = "totalRequests")]
    pub total_requests: u64,
    #[serde(rename = "successRequests")]
    pub success_requests: u64,
    #[serde(rename = "failedRequests")]
    pub failed_requests: u64,
    #[serde(rename = "hostStats")]
    pub host_stats: BTreeMap<String, HostStats>,
}

/// Global and per-host request counters.
#[derive(Default)]
pub struct StatsSink {
    global: HostCounters,
    per_host: Mutex<HashMap<String, HostCounters>>,
}

impl StatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully forwarded request for `host`.
    pub fn record_success(&self, host: &str) {
        self.record(host, true);
    }

    /// Records a failed forward (rate-limited, no route, breaker open,
    /// upstream error) for `host`.
    pub fn record_failure(&self, host: &str) {
        self.record(host, false);
    }

    fn record(&self, host: &str, success: bool) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self::apply(&self.global, success, now);

        let mut per_host = self.per_host.lock().unwrap();
        let counters = per_host.entry(host.to_string()).or_default();
        Self::apply(counters, success, now);
    }

    fn apply(counters: &HostCounters, success: bool, now: u64) {
        counters.total.fetch_add(1, Ordering::Relaxed);
        if success {
            counters.success.fetch_add(1, Ordering::Relaxed);
        } else {
            counters.failed.fetch_add(1, Ordering::Relaxed);
        }
        counters.last_request_unix_secs.store(now, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let per_host = self.per_host.lock().unwrap();
        let host_stats = per_host
            .iter()
            .map(|(host, counters)| {
                (
                    host.clone(),
                    HostStats {
                        requests: counters.total.load(Ordering::Relaxed),
                        success: counters.success.load(Ordering::Relaxed),
                        failed: counters.failed.load(Ordering::Relaxed),
                        last_request: counters.last_request_unix_secs.load(Ordering::Relaxed),
                    },
                )
            })
            .collect();

        StatsSnapshot {
            total_requests: self.global.total.load(Ordering::Relaxed),
            success_requests: self.global.success.load(Ordering::Relaxed),
            failed_requests: self.global.failed.load(Ordering::Relaxed),
            host_stats,
        }
    }
}
