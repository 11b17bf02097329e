//! ACME HTTP-01 challenge serving through the full catch-all handler,
//! proving it takes priority over routing and host validation as specified.

use std::sync::Arc;

use actix_web::{test, web, App};
use rproxy::models::settings::{
    CircuitBreakerSettings, HealthCheckSettings, ProxySettings, RateLimitSettings,
};
use rproxy::routes::proxy::{configure_proxy, GatewayState};
use rproxy::services::circuit_breaker::CircuitBreakerRegistry;
use rproxy::services::health_checker::HealthChecker;
use rproxy::services::proxy::ProxyEngine;
use rproxy::services::rate_limiter::RateLimiter;
use rproxy::services::route_table::InMemoryRouteTable;
use rproxy::services::stats::StatsSink;

fn state_with_challenge_dir(dir: std::path::PathBuf) -> web::Data<GatewayState> {
    let breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerSettings::default()));
    let health = Arc::new(HealthChecker::new(HealthCheckSettings::default()));
    let stats = Arc::new(StatsSink::new());
    let engine = Arc::new(ProxyEngine::new(
        breakers,
        health,
        stats,
        ProxySettings::default(),
    ));
    web::Data::new(GatewayState {
        routes: Arc::new(InMemoryRouteTable::new()),
        rate_limiter: Arc::new(RateLimiter::new(RateLimitSettings::default())),
        proxy: engine,
        acme_challenge_dir: dir,
    })
}

#[actix_web::test]
async fn serves_challenge_token_for_host_with_no_route() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("abc123"), "abc123.thumbprint").unwrap();

    let state = state_with_challenge_dir(dir.path().to_path_buf());
    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;

    let req = test::TestRequest::get()
        .uri("/.well-known/acme-challenge/abc123")
        .insert_header(("Host", "never-routed.example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    let body = test::read_body(resp).await;
    assert_eq!(body, "abc123.thumbprint");
}

#[actix_web::test]
async fn serves_challenge_even_with_invalid_host_header() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tok"), "key-auth").unwrap();

    let state = state_with_challenge_dir(dir.path().to_path_buf());
    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;

    let req = test::TestRequest::get()
        .uri("/.well-known/acme-challenge/tok")
        .insert_header(("Host", "..not-a-valid-host.."))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
}

#[actix_web::test]
async fn missing_token_file_yields_404_not_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let state = state_with_challenge_dir(dir.path().to_path_buf());
    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;

    let req = test::TestRequest::get()
        .uri("/.well-known/acme-challenge/does-not-exist")
        .insert_header(("Host", "example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn path_traversal_in_token_yields_404() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().parent().unwrap().join("secret"), "nope").ok();

    let state = state_with_challenge_dir(dir.path().to_path_buf());
    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;

    let req = test::TestRequest::get()
        .uri("/.well-known/acme-challenge/..%2Fsecret")
        .insert_header(("Host", "example.com"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    // Percent-decoded by actix-web before reaching the handler; either a
    // literal ".." is rejected by serve_challenge or the route itself
    // never matches non-normalized paths, but it must never be a 200.
    assert_ne!(resp.status(), actix_web::http::StatusCode::OK);
}
