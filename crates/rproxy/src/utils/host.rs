//! Host header extraction and validation.
//!
//! The engine routes purely on the Host header (or `:authority` for HTTP/2),
//! so validating it strictly matters: a malformed host must never reach the
//! Route Table lookup or get reflected back into a log line unescaped.

/// Strips an optional `:port` suffix and lowercases the result.
///
/// Handles bracketed IPv6 literals (`[::1]:8080`) by stripping the port only
/// after the closing bracket.
pub fn extract_host(raw: &str) -> String {
    let host = if let Some(rest) = raw.strip_prefix('[') {
        match rest.find(']') {
            Some(end) => &raw[..=end + 1],
            None => raw,
        }
    } else {
        match raw.rfind(':') {
            Some(idx) => &raw[..idx],
            None => raw,
        }
    };
    host.to_lowercase()
}

/// Validates a (already-lowercased, port-stripped) host per spec: ASCII
/// letters, digits, hyphens and dots only; each dot-separated label must
/// start and end with an alphanumeric character; total length at most 253.
pub fn is_valid_host(host: &str) -> bool {
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    if !host
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
    {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.as_bytes().first().is_some_and(u8::is_ascii_alphanumeric)
            && label.as_bytes().last().is_some_and(u8::is_ascii_alphanumeric)
    })
}
