//! Core engine services: the stateful pieces the routing layer is built on.
//!
//! - [`route_table`] — persisted host -> backend bindings
//! - [`rate_limiter`] — fixed-window per-IP admission control
//! - [`circuit_breaker`] — per-backend failure tracking and fail-fast
//! - [`health_checker`] — active background liveness probing
//! - [`proxy`] — the forwarding engine tying the above together
//! - [`stats`] — request counters for the stats endpoint

pub mod circuit_breaker;
pub mod health_checker;
pub mod proxy;
pub mod rate_limiter;
pub mod route_table;
pub mod stats;
