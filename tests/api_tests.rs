//! HTTP API tests
//!
//! Drives the full router (gate middleware included) with in-process
//! requests via `tower::ServiceExt::oneshot` — no listener, no network.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use joinery_manager::auth::{
    AccessGate, AdminAuthority, CertificateIssuer, CertificateStore, CertificateVerifier,
    FileCertificateStore, KeyAuthority,
};
use joinery_manager::router::{AppState, create_router};

const ADMIN_SECRET: &str = "workshop-admin-secret";

struct TestApp {
    app: Router,
    state: Arc<AppState>,
    _dir: tempfile::TempDir,
}

fn build_app(admin_secret: Option<&str>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let keys = Arc::new(KeyAuthority::initialize(&dir.path().join("keys")).unwrap());
    let store: Arc<dyn CertificateStore> =
        FileCertificateStore::open(&dir.path().join("certificates.json")).unwrap();

    let issuer = Arc::new(CertificateIssuer::new(Arc::clone(&keys), Arc::clone(&store)));
    let verifier = Arc::new(CertificateVerifier::new(Arc::clone(&keys), Arc::clone(&store)));
    let gate = Arc::new(AccessGate {
        verifier: Arc::clone(&verifier),
        public_paths: vec![
            "/api/health".to_string(),
            "/api/auth/login".to_string(),
            "/api/admin".to_string(),
        ],
    });

    let state = Arc::new(AppState {
        issuer,
        verifier,
        store,
        admin: AdminAuthority::new(admin_secret.map(String::from)),
        gate,
    });

    TestApp {
        app: create_router(Arc::clone(&state)),
        state,
        _dir: dir,
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, bearer: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Issue a certificate through the admin endpoint, returning the response
/// body.
async fn issue_via_api(app: &Router, name: &str, email: &str) -> Value {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/admin/generate-certificate",
            Some(ADMIN_SECRET),
            &json!({"client_name": name, "client_email": email, "expires_days": 30}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn health_is_public() {
    let t = build_app(Some(ADMIN_SECRET));
    let response = t.app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn gated_route_requires_certificate() {
    let t = build_app(Some(ADMIN_SECRET));
    let response = t.app.oneshot(get("/api/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get("www-authenticate").unwrap(),
        "Bearer"
    );

    let body = body_json(response).await;
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(body["message"], "Certificate required");
}

#[tokio::test]
async fn issued_certificate_grants_access() {
    let t = build_app(Some(ADMIN_SECRET));
    let issued = issue_via_api(&t.app, "Ada Doe", "ada@example.com").await;
    let certificate = issued["certificate"].as_str().unwrap();

    let response = t
        .app
        .clone()
        .oneshot(get_bearer("/api/me", certificate))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["client_name"], "Ada Doe");
    assert_eq!(body["certificate_id"], issued["certificate_id"]);

    let response = t
        .app
        .oneshot(get_bearer("/api/auth/verify", certificate))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["client_email"], "ada@example.com");
}

#[tokio::test]
async fn login_accepts_valid_certificate() {
    let t = build_app(Some(ADMIN_SECRET));
    let issued = issue_via_api(&t.app, "Ada Doe", "ada@example.com").await;

    let response = t
        .app
        .oneshot(post_json(
            "/api/auth/login",
            None,
            &json!({"certificate": issued["certificate"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["client_name"], "Ada Doe");
}

/// Login failures carry the same body whatever the reason, so responses
/// cannot be used to probe which certificate identifiers exist.
#[tokio::test]
async fn login_rejection_is_uniform() {
    let t = build_app(Some(ADMIN_SECRET));
    let issued = issue_via_api(&t.app, "Ada Doe", "ada@example.com").await;
    t.state
        .store
        .revoke(issued["certificate_id"].as_str().unwrap())
        .await
        .unwrap();

    let garbage = t
        .app
        .clone()
        .oneshot(post_json(
            "/api/auth/login",
            None,
            &json!({"certificate": "not-a-certificate"}),
        ))
        .await
        .unwrap();
    let revoked = t
        .app
        .oneshot(post_json(
            "/api/auth/login",
            None,
            &json!({"certificate": issued["certificate"]}),
        ))
        .await
        .unwrap();

    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(revoked.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(garbage).await, body_json(revoked).await);
}

#[tokio::test]
async fn revoked_certificate_is_rejected_at_the_gate() {
    let t = build_app(Some(ADMIN_SECRET));
    let issued = issue_via_api(&t.app, "Ada Doe", "ada@example.com").await;
    let certificate = issued["certificate"].as_str().unwrap();

    let response = t
        .app
        .clone()
        .oneshot(post_json(
            "/api/admin/revoke-certificate",
            Some(ADMIN_SECRET),
            &json!({"certificate_id": issued["certificate_id"]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = t
        .app
        .oneshot(get_bearer("/api/me", certificate))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Invalid or expired certificate");
}

#[tokio::test]
async fn admin_wrong_secret_is_rejected_without_side_effects() {
    let t = build_app(Some(ADMIN_SECRET));

    let response = t
        .app
        .oneshot(post_json(
            "/api/admin/generate-certificate",
            Some("wrong-secret"),
            &json!({"client_name": "Mallory", "client_email": "m@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(t.state.store.list().await.is_empty());
}

#[tokio::test]
async fn admin_endpoints_disabled_without_secret() {
    let t = build_app(None);

    let response = t
        .app
        .oneshot(post_json(
            "/api/admin/generate-certificate",
            Some("anything"),
            &json!({"client_name": "Ada", "client_email": "ada@example.com"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "admin_not_configured");
}

#[tokio::test]
async fn generate_rejects_invalid_input() {
    let t = build_app(Some(ADMIN_SECRET));

    let response = t
        .app
        .oneshot(post_json(
            "/api/admin/generate-certificate",
            Some(ADMIN_SECRET),
            &json!({"client_name": "Ada", "client_email": "not-an-email"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_request");
}

#[tokio::test]
async fn revoke_unknown_certificate_is_not_found() {
    let t = build_app(Some(ADMIN_SECRET));

    let response = t
        .app
        .oneshot(post_json(
            "/api/admin/revoke-certificate",
            Some(ADMIN_SECRET),
            &json!({"certificate_id": "no-such-id"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_returns_issued_certificates_newest_first() {
    let t = build_app(Some(ADMIN_SECRET));
    issue_via_api(&t.app, "First Client", "first@example.com").await;
    issue_via_api(&t.app, "Second Client", "second@example.com").await;

    let response = t
        .app
        .oneshot(get_bearer("/api/admin/certificates", ADMIN_SECRET))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let certificates = body["certificates"].as_array().unwrap();
    assert_eq!(certificates.len(), 2);
    assert_eq!(certificates[0]["client_name"], "Second Client");
    assert!(certificates[0]["is_active"].as_bool().unwrap());
}
