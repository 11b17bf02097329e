//! Small request-parsing helpers shared by the routing layer.
//!
//! - [`host`] — extracting and validating the Host header
//! - [`client_ip`] — deriving the originating client IP for rate limiting

pub mod client_ip;
pub mod host;
