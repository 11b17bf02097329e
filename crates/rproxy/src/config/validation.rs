//! Configuration validation with detailed error/warning/recommendation
//! reporting, in the style the gateway uses throughout its config layer.

use crate::models::settings::Settings;
use log::{info, warn};

/// Result of validating a [`Settings`] value.
///
/// # Examples
///
/// ```
/// use rproxy::config::validation::ValidationResult;
///
/// let mut result = ValidationResult::new();
/// result.add_error("missing data root".to_string());
/// assert!(!result.is_valid);
/// ```
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_recommendation(&mut self, recommendation: String) {
        self.recommendations.push(recommendation);
    }
}

/// Validates gateway [`Settings`] for structural soundness, security and
/// operational sanity.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_comprehensive(settings: &Settings) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_ports(settings, &mut result);
        Self::validate_roots(settings, &mut result);
        Self::validate_rate_limit(settings, &mut result);
        Self::validate_circuit_breaker(settings, &mut result);
        Self::validate_health_check(settings, &mut result);

        Self::log_validation_results(&result);
        result
    }

    fn validate_ports(settings: &Settings, result: &mut ValidationResult) {
        if settings.plain_port == 0 {
            result.add_error("plain_port must not be 0".to_string());
        }
        if settings.tls_port == 0 {
            result.add_error("tls_port must not be 0".to_string());
        }
        if settings.stats_port == 0 {
            result.add_error("stats_port must not be 0".to_string());
        }

        let mut ports = [settings.plain_port, settings.tls_port, settings.stats_port];
        ports.sort_unstable();
        if ports[0] == ports[1] || ports[1] == ports[2] {
            result.add_error(format!(
                "plain_port ({}), tls_port ({}) and stats_port ({}) must be distinct",
                settings.plain_port, settings.tls_port, settings.stats_port
            ));
        }

        if settings.plain_port < 1024 || settings.tls_port < 1024 {
            result.add_recommendation(
                "binding ports below 1024 requires elevated privileges or CAP_NET_BIND_SERVICE"
                    .to_string(),
            );
        }
    }

    fn validate_roots(settings: &Settings, result: &mut ValidationResult) {
        if !settings.config_root.is_absolute() {
            result.add_warning(format!(
                "config_root '{}' is not an absolute path",
                settings.config_root.display()
            ));
        }
        if !settings.data_root.is_absolute() {
            result.add_warning(format!(
                "data_root '{}' is not an absolute path",
                settings.data_root.display()
            ));
        }
        if !settings.has_tls_material() {
            result.add_recommendation(
                "no TLS certificate material found under data_root/certs — the TLS listener \
                 will stay unbound until one is provisioned"
                    .to_string(),
            );
        }
    }

    fn validate_rate_limit(settings: &Settings, result: &mut ValidationResult) {
        let rl = &settings.rate_limit;
        if rl.max_per_window == 0 {
            result.add_error("rate_limit.max_per_window must be greater than 0".to_string());
        }
        if rl.window_secs == 0 {
            result.add_error("rate_limit.window_secs must be greater than 0".to_string());
        }
        if rl.capacity == 0 {
            result.add_error("rate_limit.capacity must be greater than 0".to_string());
        }
        if rl.capacity < 100 {
            result.add_warning(
                "rate_limit.capacity is small — distinct client IPs may evict each other's \
                 counters before their window expires"
                    .to_string(),
            );
        }
    }

    fn validate_circuit_breaker(settings: &Settings, result: &mut ValidationResult) {
        let cb = &settings.circuit_breaker;
        if cb.failure_threshold == 0 {
            result.add_error("circuit_breaker.failure_threshold must be greater than 0".to_string());
        }
        if cb.success_threshold == 0 {
            result.add_error("circuit_breaker.success_threshold must be greater than 0".to_string());
        }
        if cb.monitoring_window_secs == 0 {
            result.add_error("circuit_breaker.monitoring_window_secs must be greater than 0".to_string());
        }
        if cb.open_timeout_secs == 0 {
            result.add_error("circuit_breaker.open_timeout_secs must be greater than 0".to_string());
        }
    }

    fn validate_health_check(settings: &Settings, result: &mut ValidationResult) {
        let hc = &settings.health_check;
        if hc.check_interval_secs == 0 {
            result.add_error("health_check.check_interval_secs must be greater than 0".to_string());
        }
        if hc.probe_timeout_secs == 0 {
            result.add_error("health_check.probe_timeout_secs must be greater than 0".to_string());
        }
        if hc.probe_timeout_secs >= hc.check_interval_secs {
            result.add_warning(
                "health_check.probe_timeout_secs should be smaller than check_interval_secs"
                    .to_string(),
            );
        }
        if hc.unhealthy_threshold == 0 {
            result.add_error("health_check.unhealthy_threshold must be greater than 0".to_string());
        }
    }

    fn log_validation_results(result: &ValidationResult) {
        if result.is_valid {
            info!(
                "configuration valid ({} warnings, {} recommendations)",
                result.warnings.len(),
                result.recommendations.len()
            );
        } else {
            warn!("configuration invalid: {} errors", result.errors.len());
        }
        for error in &result.errors {
            warn!("config error: {}", error);
        }
        for warning in &result.warnings {
            warn!("config warning: {}", warning);
        }
    }
}
