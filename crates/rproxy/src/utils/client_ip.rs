//! Client IP derivation for rate limiting.
//!
//! The gateway trusts proxy-supplied headers since it sits behind no load
//! balancer of its own in the deployments this engine targets; the Rate
//! Limiter uses whatever this resolves to as its admission key.

use actix_web::HttpRequest;

/// Resolves a request's client IP: first entry of `X-Forwarded-For`, then
/// `X-Real-IP`, then the connection's peer address, falling back to
/// `"unknown"`.
pub fn resolve_client_ip(req: &HttpRequest) -> String {
    if let Some(forwarded) = req.headers().get("X-Forwarded-For") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(first) = value.split(',').next() {
                let trimmed = first.trim();
                if !trimmed.is_empty() {
                    return trimmed.to_string();
                }
            }
        }
    }

    if let Some(real_ip) = req.headers().get("X-Real-IP") {
        if let Ok(value) = real_ip.to_str() {
            if !value.trim().is_empty() {
                return value.trim().to_string();
            }
        }
    }

    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn prefers_first_forwarded_for_entry() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "203.0.113.1, 10.0.0.1"))
            .to_http_request();
        assert_eq!(resolve_client_ip(&req), "203.0.113.1");
    }

    #[test]
    fn falls_back_to_real_ip() {
        let req = TestRequest::default()
            .insert_header(("X-Real-IP", "203.0.113.2"))
            .to_http_request();
        assert_eq!(resolve_client_ip(&req), "203.0.113.2");
    }

    #[test]
    fn falls_back_to_unknown_without_headers_or_peer() {
        let req = TestRequest::default().to_http_request();
        assert_eq!(resolve_client_ip(&req), "unknown");
    }
}
