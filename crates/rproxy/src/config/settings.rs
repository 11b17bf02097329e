//! Environment-driven loading of [`Settings`].
//!
//! Routes live in the Route Table (`config.db`, see
//! [`crate::services::route_table`]) rather than in a config file; what's
//! left to configure at process start is bind ports, filesystem roots, and
//! the reliability-machinery tunables. All of it is read from the
//! environment so the gateway can run under a process supervisor without a
//! config file at all.

use crate::models::settings::{
    CircuitBreakerSettings, HealthCheckSettings, ProxySettings, RateLimitSettings, Settings,
};
use log::debug;
use std::path::PathBuf;

/// Loads [`Settings`], starting from [`Settings::default`] and applying any
/// `RPROXY_*` environment overrides that are set.
///
/// # Environment Variables
///
/// - `RPROXY_CONFIG_DIR` — directory holding `config.db` (default `/etc/rproxy`)
/// - `RPROXY_DATA_DIR` — directory holding `certs/` and `acme-challenges/`
///   (default `/var/lib/rproxy`)
/// - `RPROXY_HOST` — bind address for the public listeners (default `0.0.0.0`)
/// - `RPROXY_PLAIN_PORT` — plain HTTP listener port (default `80`)
/// - `RPROXY_TLS_PORT` — HTTPS listener port (default `443`)
/// - `RPROXY_STATS_PORT` — internal stats/health listener port, bound to
///   loopback only (default `9090`)
///
/// Malformed numeric overrides are rejected rather than silently ignored.
pub fn load_settings() -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = Settings::default();

    if let Ok(dir) = std::env::var("RPROXY_CONFIG_DIR") {
        settings.config_root = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("RPROXY_DATA_DIR") {
        settings.data_root = PathBuf::from(dir);
    }
    if let Ok(host) = std::env::var("RPROXY_HOST") {
        settings.host = host;
    }
    if let Ok(port) = std::env::var("RPROXY_PLAIN_PORT") {
        settings.plain_port = parse_port("RPROXY_PLAIN_PORT", &port)?;
    }
    if let Ok(port) = std::env::var("RPROXY_TLS_PORT") {
        settings.tls_port = parse_port("RPROXY_TLS_PORT", &port)?;
    }
    if let Ok(port) = std::env::var("RPROXY_STATS_PORT") {
        settings.stats_port = parse_port("RPROXY_STATS_PORT", &port)?;
    }

    settings.rate_limit = RateLimitSettings::default();
    settings.circuit_breaker = CircuitBreakerSettings::default();
    settings.health_check = HealthCheckSettings::default();
    settings.proxy = ProxySettings::default();

    debug!(
        "loaded settings: config_root={:?} data_root={:?} plain_port={} tls_port={} stats_port={}",
        settings.config_root, settings.data_root, settings.plain_port, settings.tls_port, settings.stats_port
    );

    Ok(settings)
}

fn parse_port(var: &str, raw: &str) -> Result<u16, Box<dyn std::error::Error>> {
    raw.parse::<u16>()
        .map_err(|e| format!("invalid {}={:?}: {}", var, raw, e).into())
}
