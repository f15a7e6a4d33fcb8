//! Certificate claims and the request-scoped authenticated identity.
//!
//! # Wire encoding
//!
//! A certificate travels as a JWS compact serialization (JWT) signed with
//! ES256. The claims are this struct serialized by `serde_json` in declared
//! field order, which makes the signed byte sequence deterministic — this
//! ordering is part of the compatibility surface if certificates must be
//! verified by another implementation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims embedded in and protected by a certificate's signature.
///
/// All fields are immutable after issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateClaims {
    /// Opaque unique identifier, generated at issuance
    pub certificate_id: String,
    /// Client name the certificate was issued to
    pub client_name: String,
    /// Client email address
    pub client_email: String,
    /// Issuance timestamp (RFC 3339)
    pub issued_at: DateTime<Utc>,
    /// Expiry timestamp: `issued_at + validity_days`
    pub expires_at: DateTime<Utc>,
    /// Issuer name
    pub iss: String,
}

/// Ephemeral, request-scoped identity produced by successful verification.
///
/// Attached to the request as an axum extension; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedIdentity {
    /// Client name from the verified claims
    pub client_name: String,
    /// Client email from the verified claims
    pub client_email: String,
    /// Identifier of the certificate that authenticated this request
    pub certificate_id: String,
}

impl From<CertificateClaims> for AuthenticatedIdentity {
    fn from(claims: CertificateClaims) -> Self {
        Self {
            client_name: claims.client_name,
            client_email: claims.client_email,
            certificate_id: claims.certificate_id,
        }
    }
}
