//! Listener Supervisor: owns the gateway's three listeners (plain HTTP,
//! optional TLS, and the internal loopback-only stats/health listener) and
//! drives startup, SIGHUP reload, and graceful shutdown.
//!
//! Startup sequence: bind the plain listener, check for TLS material and
//! bind the TLS listener only if both files are present, bind the internal
//! listener, then start a health-check prober for every backend already in
//! the Route Table. Reload re-diffs the Route Table's backends and
//! starts/stops probers accordingly — it never touches the bound listeners.
//! Shutdown stops accepting new connections, stops all probers, and lets
//! actix-web's own graceful-shutdown drain in-flight requests up to the
//! per-request deadline.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use actix_web::{web, App, HttpServer};
use log::{info, warn};

use crate::middleware::security::security_headers;
use crate::models::settings::Settings;
use crate::routes::proxy::GatewayState;
use crate::routes::{health, proxy, stats};
use crate::services::circuit_breaker::CircuitBreakerRegistry;
use crate::services::health_checker::HealthChecker;
use crate::services::proxy::ProxyEngine;
use crate::services::rate_limiter::RateLimiter;
use crate::services::route_table::RouteTable;
use crate::services::stats::StatsSink;

/// Grace period for in-flight requests to finish during shutdown, matching
/// the per-request forwarding deadline so nothing legitimate gets cut short.
const SHUTDOWN_GRACE_PERIOD_SECS: u64 = 30;

/// Owns the listeners and the long-running tasks backing them.
pub struct ListenerSupervisor {
    settings: Settings,
    routes: Arc<dyn RouteTable>,
    health: Arc<HealthChecker>,
    breakers: Arc<CircuitBreakerRegistry>,
    stats: Arc<StatsSink>,
    rate_limiter: Arc<RateLimiter>,
    known_backends: Mutex<Vec<crate::models::route::Route>>,
}

impl ListenerSupervisor {
    pub fn new(
        settings: Settings,
        routes: Arc<dyn RouteTable>,
        health: Arc<HealthChecker>,
        breakers: Arc<CircuitBreakerRegistry>,
        stats: Arc<StatsSink>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            settings,
            routes,
            health,
            breakers,
            stats,
            rate_limiter,
            known_backends: Mutex::new(Vec::new()),
        }
    }

    /// Starts health-check probers for every backend currently in the Route
    /// Table. Called once at startup before listeners begin accepting.
    pub fn start_health_checks(&self) {
        let current = self.routes.all();
        let mut seen = std::collections::HashSet::new();
        for route in &current {
            if seen.insert(route.backend.clone()) {
                self.health.start(&route.backend);
            }
        }
        *self.known_backends.lock().unwrap() = current;
    }

    /// Re-diffs the Route Table against the last-known backend set and
    /// starts/stops probers for backends that were added/removed. Does not
    /// restart listeners.
    pub fn reload(&self) {
        let current = self.routes.all();
        let previous = std::mem::replace(&mut *self.known_backends.lock().unwrap(), current.clone());
        let (added, removed) = crate::services::route_table::diff_backends(&previous, &current);
        for backend in &added {
            self.health.start(backend);
        }
        for backend in &removed {
            self.health.stop(backend);
        }
        info!(
            "route table reloaded: {} routes ({} backends added, {} removed)",
            current.len(),
            added.len(),
            removed.len()
        );
    }

    /// Stops every health-check prober and releases the Route Table handle.
    /// Listeners themselves are shut down by actix-web's own graceful
    /// shutdown once the server future returns.
    pub fn shutdown(&self) {
        self.health.stop_all();
        info!("listener supervisor shut down");
    }

    /// Builds and runs the gateway's HTTP server(s) until a shutdown signal
    /// is received. Binds the plain listener unconditionally, the TLS
    /// listener only if certificate material is present under
    /// `data_root/certs`, and the internal stats/health listener on
    /// loopback only.
    pub async fn run(self: Arc<Self>) -> std::io::Result<()> {
        self.start_health_checks();

        let proxy_engine = Arc::new(ProxyEngine::new(
            self.breakers.clone(),
            self.health.clone(),
            self.stats.clone(),
            self.settings.proxy.clone(),
        ));

        let acme_challenge_dir = self.settings.acme_challenge_dir();
        let gateway_state = web::Data::new(GatewayState {
            routes: self.routes.clone(),
            rate_limiter: self.rate_limiter.clone(),
            proxy: proxy_engine,
            acme_challenge_dir: acme_challenge_dir.clone(),
        });

        let public_server = {
            let gateway_state = gateway_state.clone();
            HttpServer::new(move || {
                App::new()
                    .app_data(gateway_state.clone())
                    .wrap(security_headers())
                    .wrap(actix_web::middleware::Logger::default())
                    .configure(proxy::configure_proxy)
            })
            .shutdown_timeout(SHUTDOWN_GRACE_PERIOD_SECS)
            .bind((self.settings.host.as_str(), self.settings.plain_port))?
        };

        let mut servers = vec![public_server.run()];

        if self.settings.has_tls_material() {
            match self.build_tls_config() {
                Ok(tls_config) => {
                    let tls_state = gateway_state.clone();
                    let tls_server = HttpServer::new(move || {
                        App::new()
                            .app_data(tls_state.clone())
                            .wrap(security_headers())
                            .wrap(actix_web::middleware::Logger::default())
                            .configure(proxy::configure_proxy)
                    })
                    .shutdown_timeout(SHUTDOWN_GRACE_PERIOD_SECS)
                    .bind_rustls_0_23(
                        (self.settings.host.as_str(), self.settings.tls_port),
                        tls_config,
                    )?;
                    servers.push(tls_server.run());
                }
                Err(e) => {
                    warn!("TLS material present but failed to load: {} — TLS listener not started", e);
                }
            }
        } else {
            info!("no TLS material under data_root/certs — TLS listener not started");
        }

        let stats_state = web::Data::new(stats::StatsState {
            stats: self.stats.clone(),
            breakers: self.breakers.clone(),
        });
        let internal_server = HttpServer::new(move || {
            App::new()
                .app_data(stats_state.clone())
                .configure(health::configure_health)
                .configure(stats::configure_stats)
        })
        .shutdown_timeout(SHUTDOWN_GRACE_PERIOD_SECS)
        .bind(("127.0.0.1", self.settings.stats_port))?;
        servers.push(internal_server.run());

        futures_util::future::try_join_all(servers).await?;
        Ok(())
    }

    fn build_tls_config(&self) -> Result<rustls::ServerConfig, String> {
        use std::fs::File;
        use std::io::BufReader;

        let cert_file = File::open(self.settings.fullchain_path())
            .map_err(|e| format!("cannot open fullchain.pem: {}", e))?;
        let key_file = File::open(self.settings.privkey_path())
            .map_err(|e| format!("cannot open privkey.pem: {}", e))?;

        let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(cert_file))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("cannot parse fullchain.pem: {}", e))?;

        let key = rustls_pemfile::private_key(&mut BufReader::new(key_file))
            .map_err(|e| format!("cannot parse privkey.pem: {}", e))?
            .ok_or_else(|| "no private key found in privkey.pem".to_string())?;

        rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| format!("invalid TLS certificate/key pair: {}", e))
    }
}

/// Resolves the ACME challenge directory, creating it (and parent dirs) if
/// it doesn't exist, since the ACME handler and certbot wrapper both depend
/// on it being present before the first challenge request arrives.
pub fn ensure_acme_challenge_dir(path: &PathBuf) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

/// Installs signal handlers and waits for either SIGINT/SIGTERM (triggering
/// graceful shutdown) or SIGHUP (triggering a reload), looping on SIGHUP and
/// returning once a shutdown signal arrives.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal(supervisor: &Arc<ListenerSupervisor>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sighup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");

    loop {
        tokio::select! {
            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                return;
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                return;
            }
            _ = sighup.recv() => {
                info!("received SIGHUP, reloading routes");
                supervisor.reload();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_acme_challenge_dir_creates_nested_path() {
        let base = tempfile::tempdir().unwrap();
        let target = base.path().join("data").join("acme-challenges");
        ensure_acme_challenge_dir(&target).unwrap();
        assert!(target.is_dir());
    }
}
