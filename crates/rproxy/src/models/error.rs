//! Gateway error taxonomy and its mapping onto HTTP responses.
//!
//! Every error the engine can produce is enumerated here. None of these
//! ever leak a Rust-level message or stack trace to the client;
//! `error_response` renders a small, fixed body per kind.

use actix_web::{http::header, HttpResponse};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("invalid host: {host}")]
    InvalidHost { host: String },

    #[error("rate limited")]
    RateLimited,

    #[error("no backend configured for host: {host}")]
    NoRoute { host: String },

    #[error("circuit breaker open for backend: {backend}")]
    BreakerOpen { backend: String },

    #[error("upstream error: {message}")]
    UpstreamError { message: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl actix_web::error::ResponseError for GatewayError {
    fn error_response(&self) -> HttpResponse {
        match self {
            GatewayError::InvalidHost { host } => HttpResponse::BadRequest().json(json!({
                "error": "invalid host",
                "host": host,
            })),
            GatewayError::RateLimited => HttpResponse::TooManyRequests()
                .insert_header((header::RETRY_AFTER, "60"))
                .json(json!({ "error": "rate limited" })),
            GatewayError::NoRoute { host } => HttpResponse::BadGateway()
                .content_type("text/plain")
                .body(format!("No backend configured for host: {}", host)),
            GatewayError::BreakerOpen { .. } => HttpResponse::BadGateway()
                .content_type("text/plain")
                .body("Bad Gateway"),
            GatewayError::UpstreamError { .. } => HttpResponse::BadGateway()
                .content_type("text/plain")
                .body("Bad Gateway"),
            GatewayError::Internal(_) => {
                HttpResponse::InternalServerError().json(json!({ "error": "internal error" }))
            }
        }
    }
}
