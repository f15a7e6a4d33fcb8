//! HTTP router and shared application state

use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::auth::{
    AccessGate, AdminAuthority, AuthenticatedIdentity, CertificateIssuer, CertificateStore,
    CertificateVerifier, access_gate, handlers,
};

/// Shared application state
pub struct AppState {
    /// Certificate issuance service
    pub issuer: Arc<CertificateIssuer>,
    /// Certificate verification service
    pub verifier: Arc<CertificateVerifier>,
    /// Certificate record store
    pub store: Arc<dyn CertificateStore>,
    /// Constant-time admin secret check
    pub admin: AdminAuthority,
    /// Request gate applied to every route
    pub gate: Arc<AccessGate>,
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    let gate = Arc::clone(&state.gate);

    Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/verify", get(handlers::verify))
        .route(
            "/api/admin/generate-certificate",
            post(handlers::generate_certificate),
        )
        .route("/api/admin/certificates", get(handlers::list_certificates))
        .route(
            "/api/admin/revoke-certificate",
            post(handlers::revoke_certificate),
        )
        .route("/api/me", get(me_handler))
        // Certificate gate (applied before other layers)
        .layer(middleware::from_fn_with_state(gate, access_gate))
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
///
/// Public by design so load balancers can probe without a certificate.
/// No internal state is exposed beyond liveness and version.
async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": crate::CERTIFICATE_ISSUER,
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// GET /api/me - identity of the caller, as attached by the access gate
async fn me_handler(Extension(identity): Extension<AuthenticatedIdentity>) -> impl IntoResponse {
    Json(json!({
        "client_name": identity.client_name,
        "client_email": identity.client_email,
        "certificate_id": identity.certificate_id,
    }))
}
