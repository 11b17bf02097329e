//! `GET /internal/health` — liveness endpoint for the internal stats
//! listener (bound to loopback only, see [`crate::supervisor::ListenerSupervisor`]).

use actix_web::{web, HttpResponse, Result};
use serde_json::json;
use std::time::Instant;

/// Process start time, used to compute uptime for the health endpoint.
pub static START_TIME: once_cell::sync::Lazy<Instant> = once_cell::sync::Lazy::new(Instant::now);

/// Reports liveness, uptime and a coarse memory snapshot.
///
/// Memory usage is read from `/proc/self/statm` on Linux; unavailable on
/// other platforms, in which case the field is omitted rather than faked.
pub async fn internal_health() -> Result<HttpResponse> {
    let uptime_seconds = START_TIME.elapsed().as_secs();
    let memory_kb = read_resident_memory_kb();

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": uptime_seconds,
        "memory": {
            "residentKb": memory_kb,
        },
    })))
}

#[cfg(target_os = "linux")]
fn read_resident_memory_kb() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    let page_size_kb = 4; // standard 4KiB pages on Linux
    Some(resident_pages * page_size_kb)
}

#[cfg(not(target_os = "linux"))]
fn read_resident_memory_kb() -> Option<u64> {
    None
}

/// Registers the internal health endpoint on the given service config.
pub fn configure_health(cfg: &mut web::ServiceConfig) {
    cfg.route("/internal/health", web::get().to(internal_health));
}
