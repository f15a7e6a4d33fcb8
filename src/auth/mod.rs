//! Certificate-based authentication — issuance, verification, revocation.
//!
//! All access to the API is gated by admin-issued client certificates;
//! there is no self-registration path.
//!
//! 1. **Issuance**: the admin mints a certificate
//!    (`POST /api/admin/generate-certificate` or `joinery-manager cert issue`);
//!    a [`CertificateRecord`] is persisted before the signed certificate is
//!    handed out, so no valid certificate exists without a record.
//!
//! 2. **Verification**: every request passes through the [`gate`] middleware,
//!    which delegates to [`CertificateVerifier`]. Checks run in a strict order:
//!    parse → signature → expiry → store lookup (unknown / revoked).
//!
//! 3. **Revocation**: a one-way `is_active` flip on the stored record,
//!    consulted on every request — a revoked certificate stays
//!    cryptographically valid forever but is rejected at the lookup step.
//!
//! 4. **Audit**: every certificate lifecycle event is emitted via
//!    `tracing::info!` with structured fields.
//!
//! # Architecture
//!
//! ```text
//! Request arrives
//!   -> AccessGate (middleware) extracts bearer certificate
//!   -> CertificateVerifier: signature (KeyAuthority), expiry, store state
//!   -> AuthenticatedIdentity attached as request extension, or 401
//! ```
//!
//! Admin endpoints bypass the gate and carry their own constant-time
//! shared-secret check ([`AdminAuthority`]).

pub mod admin;
pub mod audit;
pub mod certificate;
pub mod gate;
pub mod handlers;
pub mod issuer;
pub mod keys;
pub mod store;
pub mod verifier;

pub use admin::AdminAuthority;
pub use audit::AuditEvent;
pub use certificate::{AuthenticatedIdentity, CertificateClaims};
pub use gate::{AccessGate, access_gate};
pub use issuer::{CertificateIssuer, IssuedCertificate};
pub use keys::KeyAuthority;
pub use store::{CertificateRecord, CertificateStore, FileCertificateStore, RevokeOutcome};
pub use verifier::{AuthFailure, CertificateVerifier};
