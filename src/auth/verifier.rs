//! Certificate verification.
//!
//! Checks run in a strict, fail-fast order:
//!
//! 1. Parse the compact token — structural failure → [`AuthFailure::Malformed`]
//! 2. Verify the ES256 signature — mismatch → [`AuthFailure::InvalidSignature`]
//!    (rejects anything not signed by this authority, including tampered claims)
//! 3. Check `expires_at` against the current time → [`AuthFailure::Expired`]
//! 4. Look up the record: absent → [`AuthFailure::Unknown`],
//!    inactive → [`AuthFailure::Revoked`]
//!
//! Revocation is checked *after* the signature so that store state, not
//! cryptographic validity, decides the fate of currently issued
//! certificates — which is why the store is consulted on every request
//! rather than cached.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use tracing::debug;

use super::audit::{self, AuditEvent};
use super::certificate::{AuthenticatedIdentity, CertificateClaims};
use super::keys::KeyAuthority;
use super::store::CertificateStore;

/// Why a presented certificate was rejected.
///
/// The distinct reason is for logs and audit only; clients always see the
/// same unauthorized response so that verification outcomes cannot be used
/// to enumerate certificate identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// The string is not a structurally valid signed certificate
    #[error("malformed certificate")]
    Malformed,

    /// The signature does not verify against this authority's public key
    #[error("invalid certificate signature")]
    InvalidSignature,

    /// The certificate's validity period has passed
    #[error("certificate has expired")]
    Expired,

    /// No issuance record exists for the certificate identifier
    #[error("unknown certificate")]
    Unknown,

    /// The certificate has been revoked
    #[error("certificate has been revoked")]
    Revoked,
}

/// Decides whether a presented certificate string currently grants access.
pub struct CertificateVerifier {
    keys: Arc<KeyAuthority>,
    store: Arc<dyn CertificateStore>,
}

impl CertificateVerifier {
    /// Create a verifier over the given key authority and store.
    pub fn new(keys: Arc<KeyAuthority>, store: Arc<dyn CertificateStore>) -> Self {
        Self { keys, store }
    }

    /// Verify a presented certificate string.
    ///
    /// Returns the authenticated identity on success, or the first failure
    /// in the fixed check order.
    pub async fn verify(
        &self,
        certificate: &str,
    ) -> Result<AuthenticatedIdentity, AuthFailure> {
        let result = self.verify_inner(certificate).await;
        match &result {
            Ok(identity) => {
                debug!(certificate_id = %identity.certificate_id, "Certificate verified");
                audit::emit(&AuditEvent::verified(identity));
            }
            Err(failure) => {
                audit::emit(&AuditEvent::denied(failure.to_string()));
            }
        }
        result
    }

    async fn verify_inner(
        &self,
        certificate: &str,
    ) -> Result<AuthenticatedIdentity, AuthFailure> {
        // Steps 1+2: parse and signature-verify. Expiry is checked separately
        // below so it cannot mask a signature failure (or vice versa).
        let decoded = self
            .keys
            .decode_claims::<CertificateClaims>(certificate)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => AuthFailure::InvalidSignature,
                _ => AuthFailure::Malformed,
            })?;
        let claims = decoded.claims;

        // Step 3: expiry
        if Utc::now() > claims.expires_at {
            return Err(AuthFailure::Expired);
        }

        // Step 4: issuance record and revocation state
        let record = self
            .store
            .get(&claims.certificate_id)
            .await
            .ok_or(AuthFailure::Unknown)?;
        if !record.is_active {
            return Err(AuthFailure::Revoked);
        }

        Ok(AuthenticatedIdentity::from(claims))
    }
}
