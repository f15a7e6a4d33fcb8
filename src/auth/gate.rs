//! Access gate — request-time authentication enforcement.
//!
//! Axum middleware wrapped around the whole router: every request must carry
//! a valid certificate as a bearer credential, except the configured public
//! paths (health, the login endpoint, and the admin surface which carries
//! its own shared-secret check).
//!
//! Rejections are uniform: clients always see the same 401 body regardless
//! of *why* verification failed, so the response cannot be used to probe
//! which certificate identifiers exist. The distinct reason goes to the
//! logs only.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{debug, warn};

use super::verifier::CertificateVerifier;

/// Client-visible message for every verification failure
const UNIFORM_REJECTION: &str = "Invalid or expired certificate";

/// State for the gate middleware.
pub struct AccessGate {
    /// Certificate verifier
    pub verifier: Arc<CertificateVerifier>,
    /// Path prefixes that bypass the gate
    pub public_paths: Vec<String>,
}

impl AccessGate {
    /// Check if a path bypasses the certificate gate.
    #[must_use]
    pub fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.iter().any(|p| path.starts_with(p))
    }
}

/// Extract the bearer value from an `Authorization` header string.
pub(crate) fn strip_bearer(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware enforcing certificate verification.
pub async fn access_gate(
    State(gate): State<Arc<AccessGate>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();

    if gate.is_public_path(path) {
        debug!(path = %path, "Public path, skipping certificate gate");
        return next.run(request).await;
    }

    let certificate = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(strip_bearer);

    let Some(certificate) = certificate else {
        warn!(path = %path, "Missing certificate credential");
        return unauthorized_response("Certificate required");
    };

    match gate.verifier.verify(certificate).await {
        Ok(identity) => {
            debug!(path = %path, certificate_id = %identity.certificate_id, "Authenticated request");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(failure) => {
            // Reason stays in the logs; clients get the uniform body
            warn!(path = %path, reason = %failure, "Certificate rejected");
            unauthorized_response(UNIFORM_REJECTION)
        }
    }
}

/// Create a 401 Unauthorized response.
pub(crate) fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [("WWW-Authenticate", "Bearer")],
        Json(json!({
            "error": "unauthorized",
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{keys::KeyAuthority, store::FileCertificateStore};

    fn make_gate(public_paths: Vec<String>) -> AccessGate {
        let dir = tempfile::tempdir().unwrap();
        let keys = Arc::new(KeyAuthority::initialize(&dir.path().join("keys")).unwrap());
        let store = FileCertificateStore::open(&dir.path().join("certs.json")).unwrap();
        AccessGate {
            verifier: Arc::new(CertificateVerifier::new(keys, store)),
            public_paths,
        }
    }

    #[test]
    fn public_path_check_matches_prefixes() {
        let gate = make_gate(vec![
            "/api/health".to_string(),
            "/api/auth/login".to_string(),
            "/api/admin".to_string(),
        ]);

        assert!(gate.is_public_path("/api/health"));
        assert!(gate.is_public_path("/api/admin/certificates"));
        assert!(gate.is_public_path("/api/auth/login"));
        assert!(!gate.is_public_path("/api/auth/verify"));
        assert!(!gate.is_public_path("/api/me"));
        assert!(!gate.is_public_path("/"));
    }

    #[test]
    fn strip_bearer_accepts_both_cases() {
        assert_eq!(strip_bearer("Bearer abc"), Some("abc"));
        assert_eq!(strip_bearer("bearer abc"), Some("abc"));
        assert_eq!(strip_bearer("Basic abc"), None);
        assert_eq!(strip_bearer("abc"), None);
    }
}
