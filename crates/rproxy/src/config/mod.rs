//! Configuration management for the rproxy gateway.
//!
//! Gateway settings (bind ports, filesystem roots, and the rate-limiter /
//! circuit-breaker / health-checker tunables) are process configuration,
//! loaded once at startup from the environment — see [`settings::load_settings`].
//! They are distinct from the Route Table (host -> backend bindings), which
//! lives in `config.db` under `config_root` and is mutated at runtime by
//! tooling outside this crate.
//!
//! - [`settings`] — environment-driven settings loading
//! - [`validation`] — structural and security validation with detailed
//!   errors/warnings/recommendations, in the style of the gateway's other
//!   validators

pub mod settings;
pub mod validation;
