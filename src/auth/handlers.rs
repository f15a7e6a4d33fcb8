//! HTTP handlers for the authentication endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Description |
//! |--------|------|------|-------------|
//! | `POST` | `/api/auth/login` | none (is the auth step) | Exchange a certificate for an identity payload |
//! | `GET` | `/api/auth/verify` | certificate | Echo the authenticated identity |
//! | `POST` | `/api/admin/generate-certificate` | admin secret | Issue a new client certificate |
//! | `GET` | `/api/admin/certificates` | admin secret | List issued certificates, newest first |
//! | `POST` | `/api/admin/revoke-certificate` | admin secret | Revoke a certificate by identifier |
//!
//! ## Admin authentication
//!
//! Admin endpoints require `Authorization: Bearer <admin_secret>` checked in
//! constant time by [`AdminAuthority`]. When no secret is configured the
//! endpoints return `503 Service Unavailable`.

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::AdminAuthority;
use super::audit::{self, AuditEvent};
use super::certificate::AuthenticatedIdentity;
use super::gate::{strip_bearer, unauthorized_response};
use super::store::RevokeOutcome;
use crate::Error;
use crate::router::AppState;

// ── Request types ───────────────────────────────────────────────────────────

/// Body of `POST /api/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// The signed certificate string
    pub certificate: String,
}

/// Body of `POST /api/admin/generate-certificate`.
#[derive(Debug, Deserialize)]
pub struct GenerateCertificateRequest {
    /// Client name to bind into the certificate
    pub client_name: String,
    /// Client email to bind into the certificate
    pub client_email: String,
    /// Validity period in days (1-3650)
    #[serde(default = "default_expires_days")]
    pub expires_days: u16,
}

fn default_expires_days() -> u16 {
    365
}

/// Body of `POST /api/admin/revoke-certificate`.
#[derive(Debug, Deserialize)]
pub struct RevokeCertificateRequest {
    /// Identifier of the certificate to revoke
    pub certificate_id: String,
}

// ── Client handlers ─────────────────────────────────────────────────────────

/// `POST /api/auth/login` — verify a certificate and return the identity.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> impl IntoResponse {
    match state.verifier.verify(&body.certificate).await {
        Ok(identity) => (
            StatusCode::OK,
            Json(json!({
                "message": "Login successful",
                "user": identity,
            })),
        )
            .into_response(),
        // Reason is already logged by the verifier; clients get the
        // uniform rejection
        Err(_) => unauthorized_response("Invalid or expired certificate"),
    }
}

/// `GET /api/auth/verify` — echo the identity attached by the access gate.
pub async fn verify(Extension(identity): Extension<AuthenticatedIdentity>) -> impl IntoResponse {
    Json(json!({
        "valid": true,
        "user": identity,
    }))
}

// ── Admin handlers ──────────────────────────────────────────────────────────

/// `POST /api/admin/generate-certificate` — issue a new client certificate.
pub async fn generate_certificate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<GenerateCertificateRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_admin_auth(&state.admin, &headers) {
        return response;
    }

    match state
        .issuer
        .issue(&body.client_name, &body.client_email, body.expires_days)
        .await
    {
        Ok(issued) => (StatusCode::OK, Json(issued)).into_response(),
        Err(Error::Issuance(msg)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_request", "message": msg})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Certificate issuance failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "issuance_failed",
                    "message": "Error generating client certificate"
                })),
            )
                .into_response()
        }
    }
}

/// `GET /api/admin/certificates` — list issued certificates, newest first.
pub async fn list_certificates(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if let Err(response) = check_admin_auth(&state.admin, &headers) {
        return response;
    }

    let certificates = state.store.list().await;
    (StatusCode::OK, Json(json!({ "certificates": certificates }))).into_response()
}

/// `POST /api/admin/revoke-certificate` — revoke a certificate by identifier.
///
/// An unknown identifier is a 404, distinct from a 500 storage failure, so
/// the admin can tell "already removed" from "try again".
pub async fn revoke_certificate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RevokeCertificateRequest>,
) -> impl IntoResponse {
    if let Err(response) = check_admin_auth(&state.admin, &headers) {
        return response;
    }

    match state.store.revoke(&body.certificate_id).await {
        Ok(RevokeOutcome::Revoked) => {
            audit::emit(&AuditEvent::revoked(&body.certificate_id));
            (
                StatusCode::OK,
                Json(json!({"message": "Certificate revoked successfully"})),
            )
                .into_response()
        }
        Ok(RevokeOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "not_found", "message": "Certificate not found"})),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, certificate_id = %body.certificate_id, "Revocation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "storage_failure",
                    "message": "Error revoking certificate, try again"
                })),
            )
                .into_response()
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

/// Check the `Authorization: Bearer <secret>` header against the admin
/// authority. Returns `Err(response)` if auth fails.
///
/// The `Err` variant carries the full HTTP response to return immediately.
#[allow(clippy::result_large_err)]
fn check_admin_auth(
    admin: &AdminAuthority,
    headers: &HeaderMap,
) -> Result<(), axum::response::Response> {
    if !admin.is_configured() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "admin_not_configured",
                "message": "Admin secret not configured — management endpoints disabled"
            })),
        )
            .into_response());
    }

    let presented = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(strip_bearer);

    if presented.is_some_and(|p| admin.authorize(p)) {
        Ok(())
    } else {
        warn!("Admin authentication failed");
        Err(unauthorized_response("Admin access required"))
    }
}
