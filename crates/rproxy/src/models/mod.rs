//! Data models and domain types for the rproxy gateway.
//!
//! - [`error`] — the gateway's error taxonomy and its HTTP response mapping
//! - [`route`] — a single host-to-backend binding, as stored in the Route Table
//! - [`settings`] — process-level configuration (ports, roots, tunables)
//!
//! # Examples
//!
//! ```rust
//! use rproxy::models::route::Route;
//!
//! let route = Route::new("api.example.com", "backend.internal:8080");
//! route.validate().expect("invalid route");
//! ```

pub mod error;
pub mod route;
pub mod settings;
