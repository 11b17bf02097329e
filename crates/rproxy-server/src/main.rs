//! rproxy gateway server entry point.
//!
//! Loads settings, opens the Route Table, wires the Rate Limiter, Circuit
//! Breaker Registry, Health Checker and Stats Sink together behind a
//! [`ListenerSupervisor`], and runs until SIGINT/SIGTERM.

use rproxy::config::settings::load_settings;
use rproxy::config::validation::ConfigValidator;
use rproxy::logs::logger::configure_logger;
use rproxy::models::settings::Settings;
use rproxy::services::circuit_breaker::CircuitBreakerRegistry;
use rproxy::services::health_checker::HealthChecker;
use rproxy::services::rate_limiter::RateLimiter;
use rproxy::services::route_table::{RouteTable, SqliteRouteTable};
use rproxy::services::stats::StatsSink;
use rproxy::supervisor::{ensure_acme_challenge_dir, wait_for_shutdown_signal, ListenerSupervisor};

use log::{error, info};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    let settings: Settings = load_settings().expect("failed to load settings");
    info!("starting rproxy gateway v{}", env!("CARGO_PKG_VERSION"));

    let validation = ConfigValidator::validate_comprehensive(&settings);
    if !validation.is_valid {
        for err in &validation.errors {
            error!("configuration error: {}", err);
        }
        std::process::exit(1);
    }
    for warning in &validation.warnings {
        log::warn!("configuration warning: {}", warning);
    }

    std::fs::create_dir_all(&settings.config_root)
        .expect("failed to create config_root");
    ensure_acme_challenge_dir(&settings.acme_challenge_dir())
        .expect("failed to create acme challenge directory");

    let routes: Arc<dyn RouteTable> = Arc::new(
        SqliteRouteTable::open(settings.config_db_path()).expect("failed to open route table"),
    );
    let rate_limiter = Arc::new(RateLimiter::new(settings.rate_limit.clone()));
    let breakers = Arc::new(CircuitBreakerRegistry::new(settings.circuit_breaker.clone()));
    let health = Arc::new(HealthChecker::new(settings.health_check.clone()));
    let stats = Arc::new(StatsSink::new());

    let supervisor = Arc::new(ListenerSupervisor::new(
        settings,
        routes,
        health,
        breakers,
        stats,
        rate_limiter,
    ));

    info!("listeners starting");
    tokio::select! {
        result = supervisor.clone().run() => {
            match result {
                Ok(()) => info!("all listeners stopped"),
                Err(e) => error!("listener error: {}", e),
            }
        }
        _ = wait_for_shutdown_signal(&supervisor) => {
            info!("shutting down");
            supervisor.shutdown();
        }
    }

    Ok(())
}
