//! The fixed response security headers the proxy engine adds to every
//! forwarded response on success.

use actix_web::middleware::DefaultHeaders;

/// Builds the security header set applied to proxied responses.
///
/// These are not configurable — the gateway has no pluggable middleware
/// surface (see the engine's design notes), so this is the one fixed set.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add((
            "Strict-Transport-Security",
            "max-age=31536000; includeSubDomains; preload",
        ))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
        .add(("Content-Security-Policy", "frame-ancestors 'none'"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add((
            "Permissions-Policy",
            "geolocation=(), microphone=(), camera=(), payment=(), usb=(), \
             magnetometer=(), gyroscope=(), accelerometer=()",
        ))
        .add(("X-Permitted-Cross-Domain-Policies", "none"))
}