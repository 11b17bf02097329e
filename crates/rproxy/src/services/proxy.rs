//! Proxy Engine: forwards an admitted request to its backend.
//!
//! `forward` wraps the actual upstream call in the backend's circuit
//! breaker and a bounded retry loop. Only failures plausibly caused by a
//! transient backend condition are retried — network errors, timeouts, a
//! breaker-open rejection, and 5xx responses. A 4xx response is a backend
//! success as far as the breaker and the retry loop are concerned (the
//! backend answered); it is returned to the client as-is without retrying,
//! since retrying it would just repeat the client's own mistake against the
//! backend.

use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{HttpRequest, HttpResponse};
use log::warn;

use crate::models::error::GatewayError;
use crate::models::settings::ProxySettings;
use crate::services::circuit_breaker::{BreakerError, CircuitBreakerRegistry};
use crate::services::health_checker::HealthChecker;
use crate::services::stats::StatsSink;

/// Request headers actix-web / reqwest must not forward verbatim because
/// they're connection-scoped, not message-scoped (RFC 7230 §6.1 plus the
/// non-standard `Transfer-Encoding`/`Upgrade` pair).
const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const RETRY_BACKOFFS_MS: &[u64] = &[100, 200];

/// Forwards admitted requests to their backend under circuit-breaker
/// protection, retry, and a fixed per-request deadline.
pub struct ProxyEngine {
    client: reqwest::Client,
    breakers: Arc<CircuitBreakerRegistry>,
    health: Arc<HealthChecker>,
    stats: Arc<StatsSink>,
    config: ProxySettings,
}

impl ProxyEngine {
    pub fn new(
        breakers: Arc<CircuitBreakerRegistry>,
        health: Arc<HealthChecker>,
        stats: Arc<StatsSink>,
        config: ProxySettings,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .expect("failed to build proxy http client");
        Self {
            client,
            breakers,
            health,
            stats,
            config,
        }
    }

    /// Forwards `req`/`body` to `backend`, returning the upstream response
    /// translated into an actix-web response, or a [`GatewayError`] mapped
    /// to its own status code.
    pub async fn forward(
        &self,
        req: &HttpRequest,
        body: actix_web::web::Bytes,
        host: &str,
        backend: &str,
        client_ip: &str,
    ) -> Result<HttpResponse, GatewayError> {
        let breaker = self.breakers.get(backend);
        let url = match build_upstream_url(backend, req.uri().path(), req.uri().query()) {
            Ok(url) => url,
            Err(e) => return Err(GatewayError::Internal(e)),
        };

        let mut attempt = 0u32;
        loop {
            let outcome = breaker
                .execute(|| self.send_once(req, body.clone(), &url, host, client_ip))
                .await;

            match outcome {
                Ok(response) => {
                    self.stats.record_success(host);
                    return Ok(apply_security_headers(response));
                }
                Err(BreakerError::Open(_)) => {
                    self.health.mark_unhealthy(backend, "circuit breaker open");
                    if attempt >= self.config.max_retries {
                        self.stats.record_failure(host);
                        return Err(GatewayError::BreakerOpen {
                            backend: backend.to_string(),
                        });
                    }
                    let backoff = RETRY_BACKOFFS_MS
                        .get(attempt as usize)
                        .copied()
                        .unwrap_or_else(|| *RETRY_BACKOFFS_MS.last().unwrap());
                    warn!(
                        "retrying forward to {} after breaker rejection (attempt {}, backoff {}ms)",
                        backend,
                        attempt + 1,
                        backoff
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
                Err(BreakerError::Operation(message)) => {
                    self.health.mark_unhealthy(backend, &message);
                    if attempt >= self.config.max_retries {
                        self.stats.record_failure(host);
                        return Err(GatewayError::UpstreamError { message });
                    }
                    let backoff = RETRY_BACKOFFS_MS
                        .get(attempt as usize)
                        .copied()
                        .unwrap_or_else(|| *RETRY_BACKOFFS_MS.last().unwrap());
                    warn!(
                        "retrying forward to {} (attempt {}, backoff {}ms): {}",
                        backend,
                        attempt + 1,
                        backoff,
                        message
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Sends a single upstream attempt. Returns `Ok` for any response the
    /// backend actually produced — 2xx/3xx/4xx alike — since a 4xx is the
    /// backend doing its job, not failing at it; only network errors,
    /// timeouts, and 5xx responses are `Err` and eligible for retry.
    async fn send_once(
        &self,
        req: &HttpRequest,
        body: actix_web::web::Bytes,
        url: &str,
        host: &str,
        client_ip: &str,
    ) -> Result<HttpResponse, String> {
        let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
            .map_err(|e| e.to_string())?;

        let mut builder = self.client.request(method, url);
        builder = builder.header("X-Forwarded-Host", host);
        builder = builder.header("X-Forwarded-Proto", if req.connection_info().scheme() == "https" { "https" } else { "http" });
        builder = builder.header("X-Forwarded-For", client_ip);
        builder = builder.header("X-Real-IP", client_ip);

        for (name, value) in req.headers().iter() {
            if HOP_BY_HOP_HEADERS.contains(&name.as_str().to_lowercase().as_str()) {
                continue;
            }
            if name.as_str().eq_ignore_ascii_case("host") {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        let response = builder
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_server_error() {
            return Err(format!("backend returned {}", status));
        }

        let mut built = HttpResponse::build(
            actix_web::http::StatusCode::from_u16(status.as_u16())
                .unwrap_or(actix_web::http::StatusCode::BAD_GATEWAY),
        );
        for (name, value) in response.headers().iter() {
            if HOP_BY_HOP_HEADERS.contains(&name.as_str().to_lowercase().as_str()) {
                continue;
            }
            if let (Ok(header_name), Ok(header_value)) = (
                HeaderName::from_bytes(name.as_str().as_bytes()),
                HeaderValue::from_bytes(value.as_bytes()),
            ) {
                built.insert_header((header_name, header_value));
            }
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(built.body(bytes))
    }
}

fn build_upstream_url(backend: &str, path: &str, query: Option<&str>) -> Result<String, String> {
    let mut base = reqwest::Url::parse(backend).map_err(|e| e.to_string())?;
    base.set_path(path);
    base.set_query(query);
    Ok(base.to_string())
}

fn apply_security_headers(mut response: HttpResponse) -> HttpResponse {
    for (name, value) in security_header_pairs() {
        if let (Ok(header_name), Ok(header_value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            response.headers_mut().insert(header_name, header_value);
        }
    }
    response
}

fn security_header_pairs() -> Vec<(&'static str, &'static str)> {
    // Mirrors middleware::security::security_headers' fixed set, applied
    // here too since proxied responses are built directly rather than
    // passed through the App-level DefaultHeaders middleware.
    vec![
        ("X-Content-Type-Options", "nosniff"),
        ("X-Frame-Options", "DENY"),
        (
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ),
        ("Referrer-Policy", "strict-origin-when-cross-origin"),
        ("Content-Security-Policy", "frame-ancestors 'none'"),
        ("X-XSS-Protection", "1; mode=block"),
        (
            "Permissions-Policy",
            "geolocation=(), microphone=(), camera=(), payment=(), usb=(), \
             magnetometer=(), gyroscope=(), accelerometer=()",
        ),
        ("X-Permitted-Cross-Domain-Policies", "none"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_upstream_url_with_path_and_query() {
        let url = build_upstream_url("http://backend.internal:8080", "/v1/users", Some("id=1")).unwrap();
        assert_eq!(url, "http://backend.internal:8080/v1/users?id=1");
    }

    #[test]
    fn builds_upstream_url_without_query() {
        let url = build_upstream_url("http://backend.internal:8080", "/health", None).unwrap();
        assert_eq!(url, "http://backend.internal:8080/health");
    }

    #[test]
    fn rejects_malformed_backend() {
        assert!(build_upstream_url("not a url", "/", None).is_err());
    }
}
