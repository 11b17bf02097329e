//! `rproxy` — a host-based HTTP/HTTPS reverse proxy engine.
//!
//! Terminates client connections, selects a backend by Host header, and
//! forwards the request under admission control (rate limiting, host
//! validation) and reliability machinery (timeouts, retries, circuit
//! breaking, active health checks). Also serves ACME HTTP-01 challenges on
//! the plain listener ahead of routing.
//!
//! This crate is the engine; [`crate::supervisor::ListenerSupervisor`] is the
//! seam a binary wires listeners, signal handling and settings through — see
//! the `rproxy-server` crate for that wiring.

pub mod config;
pub mod logs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod supervisor;
pub mod utils;
