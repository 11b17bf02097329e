//! End-to-end scenarios driving the catch-all handler against a real
//! (in-process) upstream, exercising routing, rate limiting and retry
//! behavior together rather than each service in isolation.

use std::sync::Arc;

use actix_web::{test, web, App, HttpResponse};
use rproxy::models::route::Route;
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

/// Spawns a tiny upstream that always answers 200 with a fixed body, bound to
/// an OS-assigned loopback port, and returns its base URL.
async fn spawn_upstream_ok() -> String {
    let server = actix_web::HttpServer::new(|| {
        App::new().default_service(web::route().to(|| async { HttpResponse::Ok().body("upstream-ok") }))
    })
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let running = server.run();
    tokio::spawn(running);
    format!("http://{}", addr)
}

/// Spawns an upstream that always answers 500, to exercise retry and the
/// circuit breaker.
async fn spawn_upstream_failing() -> String {
    let server = actix_web::HttpServer::new(|| {
        App::new().default_service(
            web::route().to(|| async { HttpResponse::InternalServerError().finish() }),
        )
    })
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let running = server.run();
    tokio::spawn(running);
    format!("http://{}", addr)
}

/// Spawns an upstream that always answers 404, to confirm client errors pass
/// straight through without being retried or counted against the breaker.
async fn spawn_upstream_not_found() -> String {
    let server = actix_web::HttpServer::new(|| {
        App::new().default_service(web::route().to(|| async { HttpResponse::NotFound().body("nope") }))
    })
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    let running = server.run();
    tokio::spawn(running);
    format!("http://{}", addr)
}

fn gateway_state(
    routes: InMemoryRouteTable,
    rate_limit: RateLimitSettings,
    circuit_breaker: CircuitBreakerSettings,
    proxy: ProxySettings,
) -> web::Data<GatewayState> {
    let breakers = Arc::new(CircuitBreakerRegistry::new(circuit_breaker));
    let health = Arc::new(HealthChecker::new(HealthCheckSettings::default()));
    let stats = Arc::new(StatsSink::new());
    let engine = Arc::new(ProxyEngine::new(breakers, health, stats, proxy));
    web::Data::new(GatewayState {
        routes: Arc::new(routes),
        rate_limiter: Arc::new(RateLimiter::new(rate_limit)),
        proxy: engine,
        acme_challenge_dir: std::env::temp_dir().join("rproxy-integration-acme"),
    })
}

#[actix_web::test]
async fn forwards_to_healthy_backend() {
    let backend = spawn_upstream_ok().await;
    let routes = InMemoryRouteTable::with_routes([Route::new("a.test", backend.as_str())]);
    let state = gateway_state(
        routes,
        RateLimitSettings::default(),
        CircuitBreakerSettings::default(),
        ProxySettings::default(),
    );

    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;
    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(("Host", "a.test"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::OK);

    let body = test::read_body(resp).await;
    assert_eq!(body, "upstream-ok");
}

#[actix_web::test]
async fn forwarded_response_carries_security_headers() {
    let backend = spawn_upstream_ok().await;
    let routes = InMemoryRouteTable::with_routes([Route::new("b.test", backend.as_str())]);
    let state = gateway_state(
        routes,
        RateLimitSettings::default(),
        CircuitBreakerSettings::default(),
        ProxySettings::default(),
    );

    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;
    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(("Host", "b.test"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.headers().contains_key("X-Content-Type-Options"));
    assert!(resp.headers().contains_key("Strict-Transport-Security"));
}

#[actix_web::test]
async fn fourth_request_in_window_is_rate_limited() {
    let backend = spawn_upstream_ok().await;
    let routes = InMemoryRouteTable::with_routes([Route::new("c.test", backend.as_str())]);
    let rate_limit = RateLimitSettings {
        max_per_window: 3,
        window_secs: 60,
        capacity: 100,
    };
    let state = gateway_state(
        routes,
        rate_limit,
        CircuitBreakerSettings::default(),
        ProxySettings::default(),
    );

    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;
    for _ in 0..3 {
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("Host", "c.test"))
            .insert_header(("X-Forwarded-For", "9.9.9.9"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    }

    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(("Host", "c.test"))
        .insert_header(("X-Forwarded-For", "9.9.9.9"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::TOO_MANY_REQUESTS);
}

#[actix_web::test]
async fn repeated_backend_failures_trip_circuit_breaker() {
    let backend = spawn_upstream_failing().await;
    let routes = InMemoryRouteTable::with_routes([Route::new("d.test", backend.as_str())]);
    let circuit_breaker = CircuitBreakerSettings {
        failure_threshold: 2,
        success_threshold: 2,
        monitoring_window_secs: 10,
        open_timeout_secs: 60,
    };
    let proxy = ProxySettings {
        request_timeout_secs: 5,
        max_retries: 0,
    };
    let state = gateway_state(routes, RateLimitSettings::default(), circuit_breaker, proxy);

    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;

    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("Host", "d.test"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_GATEWAY);
    }

    // Third request should fail fast via the now-open breaker, still a 502
    // to the client but without reaching the backend again.
    let req = test::TestRequest::get()
        .uri("/")
        .insert_header(("Host", "d.test"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn client_errors_pass_through_without_tripping_breaker() {
    let backend = spawn_upstream_not_found().await;
    let routes = InMemoryRouteTable::with_routes([Route::new("e.test", backend.as_str())]);
    let circuit_breaker = CircuitBreakerSettings {
        failure_threshold: 2,
        success_threshold: 2,
        monitoring_window_secs: 10,
        open_timeout_secs: 60,
    };
    let state = gateway_state(
        routes,
        RateLimitSettings::default(),
        circuit_breaker,
        ProxySettings::default(),
    );

    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;

    // Well past the failure threshold — a working breaker would have opened
    // after the second 404 if it misclassified client errors as failures.
    for _ in 0..5 {
        let req = test::TestRequest::get()
            .uri("/missing")
            .insert_header(("Host", "e.test"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
        let body = test::read_body(resp).await;
        assert_eq!(body, "nope");
    }
}

#[actix_web::test]
async fn unknown_host_is_bad_gateway_not_internal_error() {
    let state = gateway_state(
        InMemoryRouteTable::new(),
        RateLimitSettings::default(),
        CircuitBreakerSettings::default(),
        ProxySettings::default(),
    );
    let app = test::init_service(App::new().app_data(state).configure(configure_proxy)).await;
    let req = test::TestRequest::get()
        .uri("/anything")
        .insert_header(("Host", "nowhere.test"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), actix_web::http::StatusCode::BAD_GATEWAY);
}
