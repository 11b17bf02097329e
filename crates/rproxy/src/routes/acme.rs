//! ACME HTTP-01 challenge serving.
//!
//! Takes priority over routing, host validation and rate limiting: the
//! catch-all handler checks the request path against this module's prefix
//! before doing anything else, so a challenge request is served even for a
//! host that has no route, or from a client that has exhausted its rate
//! limit.

use std::path::{Path, PathBuf};

use actix_web::{HttpResponse, Result};

const CHALLENGE_PATH_PREFIX: &str = "/.well-known/acme-challenge/";

/// Whether `path` is an ACME HTTP-01 challenge request this handler owns.
pub fn is_acme_challenge_path(path: &str) -> bool {
    path.starts_with(CHALLENGE_PATH_PREFIX)
}

/// Serves the challenge token file for `path` from `challenge_dir`.
///
/// Rejects tokens containing `/` or `..` outright rather than relying on
/// path canonicalization, since the token is attacker-controlled input
/// straight off the URL.
pub async fn serve_challenge(challenge_dir: &Path, path: &str) -> Result<HttpResponse> {
    let token = match path.strip_prefix(CHALLENGE_PATH_PREFIX) {
        Some(token) => token,
        None => return Ok(HttpResponse::NotFound().finish()),
    };

    if token.is_empty() || token.contains('/') || token.contains("..") {
        return Ok(HttpResponse::NotFound().finish());
    }

    let file_path: PathBuf = challenge_dir.join(token);
    match tokio::fs::read_to_string(&file_path).await {
        Ok(contents) => Ok(HttpResponse::Ok()
            .content_type("text/plain")
            .body(contents)),
        Err(_) => Ok(HttpResponse::NotFound().finish()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn recognizes_challenge_paths() {
        assert!(is_acme_challenge_path(
            "/.well-known/acme-challenge/abc123"
        ));
        assert!(!is_acme_challenge_path("/api/users"));
    }

    #[tokio::test]
    async fn serves_existing_token() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("abc123"), "the-key-authorization").unwrap();

        let resp = serve_challenge(dir.path(), "/.well-known/acme-challenge/abc123")
            .await
            .unwrap();
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn returns_404_for_missing_token() {
        let dir = tempdir().unwrap();
        let resp = serve_challenge(dir.path(), "/.well-known/acme-challenge/missing")
            .await
            .unwrap();
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejects_path_traversal_token() {
        let dir = tempdir().unwrap();
        let resp = serve_challenge(dir.path(), "/.well-known/acme-challenge/../../etc/passwd")
            .await
            .unwrap();
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn rejects_token_with_embedded_slash() {
        let dir = tempdir().unwrap();
        let resp = serve_challenge(dir.path(), "/.well-known/acme-challenge/a/b")
            .await
            .unwrap();
        assert_eq!(resp.status(), actix_web::http::StatusCode::NOT_FOUND);
    }
}
