//! The catch-all handler backing the public listeners: ACME challenge
//! priority, then host extraction/validation, rate limiting, route lookup
//! and forwarding, in that precedence.

use std::path::PathBuf;
use std::sync::Arc;

use actix_web::{web, HttpRequest, HttpResponse};

use crate::models::error::GatewayError;
use crate::routes::acme;
use crate::services::proxy::ProxyEngine;
use crate::services::rate_limiter::{Admission, RateLimiter};
use crate::services::route_table::RouteTable;
use crate::utils::client_ip::resolve_client_ip;
use crate::utils::host::{extract_host, is_valid_host};

/// Shared state the catch-all handler reads from, owned by the [`crate::supervisor::ListenerSupervisor`].
pub struct GatewayState {
    pub routes: Arc<dyn RouteTable>,
    pub rate_limiter: Arc<RateLimiter>,
    pub proxy: Arc<ProxyEngine>,
    pub acme_challenge_dir: PathBuf,
}

/// Handles every request on the plain and TLS listeners.
pub async fn handle(
    state: web::Data<GatewayState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let path = req.uri().path();
    if acme::is_acme_challenge_path(path) {
        return acme::serve_challenge(&state.acme_challenge_dir, path)
            .await
            .map_err(|_| GatewayError::Internal("failed to serve ACME challenge".to_string()));
    }

    let raw_host = req
        .headers()
        .get(actix_web::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();
    let host = extract_host(raw_host);

    if !is_valid_host(&host) {
        return Err(GatewayError::InvalidHost { host });
    }

    let client_ip = resolve_client_ip(&req);
    if state.rate_limiter.admit(&client_ip) == Admission::Limited {
        return Err(GatewayError::RateLimited);
    }

    let route = state
        .routes
        .get(&host)
        .ok_or_else(|| GatewayError::NoRoute { host: host.clone() })?;

    state
        .proxy
        .forward(&req, body, &host, &route.backend, &client_ip)
        .await
}

/// Registers the catch-all route. Must be the last service configured so
/// more specific routes (the internal health/stats listener has its own
/// `App`) take precedence where applicable.
pub fn configure_proxy(cfg: &mut web::ServiceConfig) {
    cfg.default_service(web::route().to(handle));
}
