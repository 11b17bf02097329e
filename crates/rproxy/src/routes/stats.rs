//! `GET /internal/stats` — request counters and circuit breaker states,
//! served on the internal loopback-only listener.

use std::sync::Arc;

use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::services::circuit_breaker::CircuitBreakerRegistry;
use crate::services::stats::StatsSink;

/// Shared state the stats endpoints read from.
pub struct StatsState {
    pub stats: Arc<StatsSink>,
    pub breakers: Arc<CircuitBreakerRegistry>,
}

pub async fn internal_stats(state: web::Data<StatsState>) -> Result<HttpResponse> {
    let snapshot = state.stats.snapshot();
    let breakers = state.breakers.stats_snapshot();

    let mut body = serde_json::to_value(&snapshot).unwrap_or_else(|_| json!({}));
    body["circuitBreakers"] = json!(breakers
        .iter()
        .map(|b| json!({
            "backend": b.backend,
            "state": format!("{:?}", b.state),
            "failuresInWindow": b.failures_in_window,
            "consecutiveSuccesses": b.consecutive_successes,
        }))
        .collect::<Vec<_>>());

    Ok(HttpResponse::Ok().json(body))
}

pub fn configure_stats(cfg: &mut web::ServiceConfig) {
    cfg.route("/internal/stats", web::get().to(internal_stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::CircuitBreakerSettings;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn stats_endpoint_returns_json() {
        let stats = Arc::new(StatsSink::new());
        stats.record_success("a.test");
        let breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerSettings::default()));

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(StatsState { stats, breakers }))
                .configure(configure_stats),
        )
        .await;
        let req = test::TestRequest::get().uri("/internal/stats").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
