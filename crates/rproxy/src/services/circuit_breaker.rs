//! Per-backend circuit breaker protecting upstream services from repeated
//! failed forwards.
//!
//! Unlike a consecutive-failure counter, the breaker here tracks failure
//! *timestamps* within a sliding window: a burst of 5 failures inside 10
//! seconds opens the circuit, but failures that age out of the window don't
//! count towards the threshold. This matches the property tests the gateway
//! is held to (a slow trickle of failures spread out over minutes must never
//! trip the breaker).

use log::{debug, info, warn};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::models::settings::CircuitBreakerSettings;

/// State of a single backend's circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation — requests pass through.
    Closed,
    /// Tripped — requests fail fast without reaching the backend.
    Open,
    /// Probationary — one request is let through to test recovery.
    HalfOpen,
}

/// Point-in-time snapshot of a breaker's counters, for the stats endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct BreakerStats {
    pub backend: String,
    pub state: CircuitState,
    pub failures_in_window: usize,
    pub consecutive_successes: u32,
}

struct Inner {
    state: CircuitState,
    failures: VecDeque<Instant>,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
}

/// A single backend's circuit breaker.
pub struct CircuitBreaker {
    backend: String,
    config: CircuitBreakerSettings,
    inner: Mutex<Inner>,
}

/// Error returned by [`CircuitBreaker::execute`].
#[derive(Debug, thiserror::Error)]
pub enum BreakerError<E> {
    #[error("circuit breaker open for backend: {0}")]
    Open(String),
    #[error(transparent)]
    Operation(E),
}

impl CircuitBreaker {
    fn new(backend: String, config: CircuitBreakerSettings) -> Self {
        Self {
            backend,
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                failures: VecDeque::new(),
                consecutive_successes: 0,
                opened_at: None,
            }),
        }
    }

    /// Runs `operation` through the breaker: fails fast if open, otherwise
    /// executes it and records the outcome.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            debug!("circuit breaker for {} is open, failing fast", self.backend);
            return Err(BreakerError::Open(self.backend.clone()));
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(BreakerError::Operation(err))
            }
        }
    }

    /// Whether a request may currently be attempted against this backend.
    /// Transitions OPEN -> HALF_OPEN here when the open timeout has elapsed.
    fn admit(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= Duration::from_secs(self.config.open_timeout_secs) {
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    info!("circuit breaker for {} -> half-open", self.backend);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                inner.failures.clear();
            }
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.failures.clear();
                    inner.consecutive_successes = 0;
                    inner.opened_at = None;
                    info!("circuit breaker for {} -> closed (recovered)", self.backend);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        let now = Instant::now();
        match inner.state {
            CircuitState::Closed => {
                inner.failures.push_back(now);
                self.evict_stale(&mut inner, now);
                if inner.failures.len() >= self.config.failure_threshold as usize {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    warn!(
                        "circuit breaker for {} -> open ({} failures in {}s window)",
                        self.backend,
                        inner.failures.len(),
                        self.config.monitoring_window_secs
                    );
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                inner.consecutive_successes = 0;
                inner.failures.clear();
                inner.failures.push_back(now);
                warn!(
                    "circuit breaker for {} -> open (probe failed in half-open)",
                    self.backend
                );
            }
            CircuitState::Open => {
                inner.opened_at = Some(now);
            }
        }
    }

    fn evict_stale(&self, inner: &mut Inner, now: Instant) {
        let window = Duration::from_secs(self.config.monitoring_window_secs);
        while let Some(&oldest) = inner.failures.front() {
            if now.duration_since(oldest) > window {
                inner.failures.pop_front();
            } else {
                break;
            }
        }
    }

    /// Forces the breaker back to the closed state, clearing all counters.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.state = CircuitState::Closed;
        inner.failures.clear();
        inner.consecutive_successes = 0;
        inner.opened_at = None;
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }

    pub fn stats(&self) -> BreakerStats {
        let inner = self.inner.lock().unwrap();
        BreakerStats {
            backend: self.backend.clone(),
            state: inner.state,
            failures_in_window: inner.failures.len(),
            consecutive_successes: inner.consecutive_successes,
        }
    }
}

/// Owns one [`CircuitBreaker`] per backend, creating them lazily on first use.
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerSettings,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    pub fn new(config: CircuitBreakerSettings) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the breaker for `backend`, creating one with the registry's
    /// configured thresholds if this is the first time it's seen.
    pub fn get(&self, backend: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap();
        breakers
            .entry(backend.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(backend.to_string(), self.config.clone())))
            .clone()
    }

    /// Snapshot of every breaker the registry has created so far, for the
    /// stats endpoint.
    pub fn stats_snapshot(&self) -> Vec<BreakerStats> {
        self.breakers
            .lock()
            .unwrap()
            .values()
            .map(|b| b.stats())
            .collect()
    }
}
