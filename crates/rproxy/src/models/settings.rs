//! Top-level gateway settings: ports, filesystem roots, and the tunable
//! thresholds for the rate limiter, circuit breaker, and health checker.
//!
//! Unlike the route table (host -> backend bindings, persisted in
//! `config.db`), these settings are process configuration: read once at
//! startup from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Rate limiter tunables: fixed-window admission control per client IP.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateLimitSettings {
    pub max_per_window: u32,
    pub window_secs: u64,
    pub capacity: usize,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_per_window: 60,
            window_secs: 60,
            capacity: 10_000,
        }
    }
}

/// Circuit breaker tunables: sliding-window failure accounting per backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerSettings {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub monitoring_window_secs: u64,
    pub open_timeout_secs: u64,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            monitoring_window_secs: 10,
            open_timeout_secs: 60,
        }
    }
}

/// Health checker tunables: active per-backend probing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthCheckSettings {
    pub check_interval_secs: u64,
    pub probe_timeout_secs: u64,
    pub unhealthy_threshold: u32,
}

impl Default for HealthCheckSettings {
    fn default() -> Self {
        Self {
            check_interval_secs: 30,
            probe_timeout_secs: 5,
            unhealthy_threshold: 3,
        }
    }
}

/// Proxy engine tunables: request timeout and retry budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProxySettings {
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 2,
        }
    }
}

/// Complete gateway settings, assembled by [`crate::config::settings::load_settings`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Directory holding `config.db` (the Route Table).
    pub config_root: PathBuf,
    /// Directory holding `certs/` and `acme-challenges/`.
    pub data_root: PathBuf,
    /// Bind address for the public listeners.
    pub host: String,
    pub plain_port: u16,
    pub tls_port: u16,
    pub stats_port: u16,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub health_check: HealthCheckSettings,
    #[serde(default)]
    pub proxy: ProxySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_root: PathBuf::from("/etc/rproxy"),
            data_root: PathBuf::from("/var/lib/rproxy"),
            host: "0.0.0.0".to_string(),
            plain_port: 80,
            tls_port: 443,
            stats_port: 9090,
            rate_limit: RateLimitSettings::default(),
            circuit_breaker: CircuitBreakerSettings::default(),
            health_check: HealthCheckSettings::default(),
            proxy: ProxySettings::default(),
        }
    }
}

impl Settings {
    pub fn config_db_path(&self) -> PathBuf {
        self.config_root.join("config.db")
    }

    pub fn cert_dir(&self) -> PathBuf {
        self.data_root.join("certs")
    }

    pub fn privkey_path(&self) -> PathBuf {
        self.cert_dir().join("privkey.pem")
    }

    pub fn fullchain_path(&self) -> PathBuf {
        self.cert_dir().join("fullchain.pem")
    }

    pub fn acme_challenge_dir(&self) -> PathBuf {
        self.data_root
            .join("acme-challenges")
            .join(".well-known")
            .join("acme-challenge")
    }

    /// Whether both TLS material files exist.
    pub fn has_tls_material(&self) -> bool {
        self.privkey_path().is_file() && self.fullchain_path().is_file()
    }
}
