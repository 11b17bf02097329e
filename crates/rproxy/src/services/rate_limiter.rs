//! Fixed-window, per-client-IP rate limiting.
//!
//! Each IP gets a window of `max_per_window` requests every `window_secs`
//! seconds. Windows reset on first use after expiry rather than sliding,
//! trading a small amount of burst tolerance at window edges for O(1)
//! bookkeeping per request. Counters are kept in an LRU cache bounded at
//! `capacity` entries so an attacker spraying requests from distinct source
//! IPs cannot grow the limiter's memory without bound.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::settings::RateLimitSettings;

/// Outcome of a [`RateLimiter::admit`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Ok,
    Limited,
}

struct Window {
    count: u32,
    started_at: Instant,
}

/// Fixed-window rate limiter shared across all listeners.
pub struct RateLimiter {
    max_per_window: u32,
    window: Duration,
    windows: Mutex<LruCache<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitSettings) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            max_per_window: config.max_per_window,
            window: Duration::from_secs(config.window_secs),
            windows: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Records one request from `client_ip` and reports whether it's
    /// admitted under the current window.
    pub fn admit(&self, client_ip: &str) -> Admission {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        match windows.get_mut(client_ip) {
            Some(window) if now.duration_since(window.started_at) < self.window => {
                if window.count < self.max_per_window {
                    window.count += 1;
                    Admission::Ok
                } else {
                    Admission::Limited
                }
            }
            _ => {
                windows.put(
                    client_ip.to_string(),
                    Window {
                        count: 1,
                        started_at: now,
                    },
                );
                Admission::Ok
            }
        }
    }
}
