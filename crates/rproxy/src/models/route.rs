//! Route data model: the host-to-backend binding the engine forwards by.
//!
//! Deliberately narrow: one host maps to exactly one backend URL.
//! Multi-backend load balancing per host is an explicit non-goal; adding it
//! later means changing both this struct and the backend-selection step in
//! the proxy engine.

use serde::{Deserialize, Serialize};

/// A single host -> backend binding as stored in the Route Table.
///
/// `host` is always the lowercased authority form without port. `backend` is
/// always an absolute URL with scheme and authority; callers that omit a
/// scheme get `http://` prepended by [`Route::new`].
///
/// # Examples
///
/// ```
/// use rproxy::models::route::Route;
///
/// let route = Route::new("api.example.com", "backend.internal:8080");
/// assert_eq!(route.host, "api.example.com");
/// assert_eq!(route.backend, "http://backend.internal:8080");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub host: String,
    pub backend: String,
}

impl Route {
    /// Builds a route, lowercasing the host and normalizing the backend URL.
    pub fn new(host: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            host: host.into().to_lowercase(),
            backend: normalize_backend(&backend.into()),
        }
    }

    /// Validates that the backend is a well-formed absolute `http(s)` URL.
    ///
    /// Host syntax is validated separately (see [`crate::utils::host`]) since
    /// it applies to the *incoming* request's Host header, not to routes
    /// loaded from storage.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.is_empty() {
            return Err("route host must not be empty".to_string());
        }
        if !self.backend.starts_with("http://") && !self.backend.starts_with("https://") {
            return Err(format!(
                "route backend must be an absolute http(s) URL: {}",
                self.backend
            ));
        }
        reqwest::Url::parse(&self.backend)
            .map_err(|e| format!("invalid backend URL '{}': {}", self.backend, e))?;
        Ok(())
    }
}

/// Prepends `http://` to backends supplied without a scheme.
fn normalize_backend(backend: &str) -> String {
    if backend.starts_with("http://") || backend.starts_with("https://") {
        backend.to_string()
    } else {
        format!("http://{}", backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_host() {
        let route = Route::new("API.Example.COM", "http://backend");
        assert_eq!(route.host, "api.example.com");
    }

    #[test]
    fn adds_missing_scheme() {
        let route = Route::new("a.test", "127.0.0.1:9001");
        assert_eq!(route.backend, "http://127.0.0.1:9001");
    }

    #[test]
    fn keeps_existing_scheme() {
        let route = Route::new("a.test", "https://127.0.0.1:9001");
        assert_eq!(route.backend, "https://127.0.0.1:9001");
    }

    #[test]
    fn rejects_non_http_backend() {
        let route = Route {
            host: "a.test".to_string(),
            backend: "ftp://127.0.0.1".to_string(),
        };
        assert!(route.validate().is_err());
    }
}
