//! Certificate issuance.
//!
//! Minting order matters: the [`CertificateRecord`] is durably stored
//! *before* the signed certificate string is returned, so a valid
//! certificate can never exist without a matching record. If persistence
//! fails the whole operation fails and nothing is handed out.

use std::sync::Arc;
use std::sync::LazyLock;

use chrono::{Duration, Utc};
use regex::Regex;
use tracing::info;

use super::audit::{self, AuditEvent};
use super::certificate::CertificateClaims;
use super::keys::KeyAuthority;
use super::store::{CertificateRecord, CertificateStore};
use crate::{Error, Result};

/// Maximum validity period in days (10 years)
pub const MAX_VALIDITY_DAYS: u16 = 3650;

/// Loose email syntax check: one `@`, no whitespace, dotted domain.
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// A freshly minted certificate, returned to the admin exactly once.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssuedCertificate {
    /// Unique certificate identifier
    pub certificate_id: String,
    /// Client name the certificate was issued to
    pub client_name: String,
    /// Client email address
    pub client_email: String,
    /// Issuance timestamp
    pub issued_at: chrono::DateTime<Utc>,
    /// Expiry timestamp
    pub expires_at: chrono::DateTime<Utc>,
    /// The signed certificate string (handed to the client out-of-band)
    pub certificate: String,
}

/// Mints signed certificates for named clients.
pub struct CertificateIssuer {
    keys: Arc<KeyAuthority>,
    store: Arc<dyn CertificateStore>,
}

impl CertificateIssuer {
    /// Create an issuer over the given key authority and store.
    pub fn new(keys: Arc<KeyAuthority>, store: Arc<dyn CertificateStore>) -> Self {
        Self { keys, store }
    }

    /// Issue a certificate for `client_name` / `client_email`, valid for
    /// `validity_days` from now.
    ///
    /// # Errors
    ///
    /// - [`Error::Issuance`] when the identity fields or validity period are
    ///   invalid (no state is touched).
    /// - [`Error::Store`] when the record cannot be persisted (no certificate
    ///   is returned and no record remains).
    pub async fn issue(
        &self,
        client_name: &str,
        client_email: &str,
        validity_days: u16,
    ) -> Result<IssuedCertificate> {
        let client_name = client_name.trim();
        if client_name.is_empty() {
            return Err(Error::Issuance("client_name must not be empty".to_string()));
        }
        let client_email = client_email.trim();
        if !EMAIL_RE.is_match(client_email) {
            return Err(Error::Issuance(format!(
                "client_email '{client_email}' is not a valid email address"
            )));
        }
        if validity_days == 0 || validity_days > MAX_VALIDITY_DAYS {
            return Err(Error::Issuance(format!(
                "expires_days must be between 1 and {MAX_VALIDITY_DAYS}"
            )));
        }

        let certificate_id = uuid::Uuid::new_v4().to_string();
        let issued_at = Utc::now();
        let expires_at = issued_at + Duration::days(i64::from(validity_days));

        let claims = CertificateClaims {
            certificate_id: certificate_id.clone(),
            client_name: client_name.to_string(),
            client_email: client_email.to_string(),
            issued_at,
            expires_at,
            iss: crate::CERTIFICATE_ISSUER.to_string(),
        };
        let certificate = self.keys.sign_claims(&claims)?;

        // Issuance is not complete until the record is durably stored
        let record = CertificateRecord {
            certificate_id: certificate_id.clone(),
            client_name: client_name.to_string(),
            client_email: client_email.to_string(),
            issued_at,
            expires_at,
            is_active: true,
            revoked_at: None,
            signed_certificate: certificate.clone(),
        };
        self.store.put(record).await?;

        info!(certificate_id = %certificate_id, client = %client_name, "Issued certificate");
        audit::emit(&AuditEvent::issued(&certificate_id, client_name, client_email));

        Ok(IssuedCertificate {
            certificate_id,
            client_name: client_name.to_string(),
            client_email: client_email.to_string(),
            issued_at,
            expires_at,
            certificate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::FileCertificateStore;

    fn issuer_in(dir: &std::path::Path) -> (CertificateIssuer, Arc<FileCertificateStore>) {
        let keys = Arc::new(KeyAuthority::initialize(&dir.join("keys")).unwrap());
        let store = FileCertificateStore::open(&dir.join("certs.json")).unwrap();
        (
            CertificateIssuer::new(keys, Arc::clone(&store) as Arc<dyn CertificateStore>),
            store,
        )
    }

    #[tokio::test]
    async fn issue_stores_matching_active_record() {
        let dir = tempfile::tempdir().unwrap();
        let (issuer, store) = issuer_in(dir.path());

        let issued = issuer
            .issue("Ada Doe", "ada@example.com", 30)
            .await
            .unwrap();

        let record = store.get(&issued.certificate_id).await.unwrap();
        assert!(record.is_active);
        assert_eq!(record.client_name, "Ada Doe");
        assert_eq!(record.signed_certificate, issued.certificate);
        assert_eq!(record.expires_at, issued.expires_at);
    }

    #[tokio::test]
    async fn issue_rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let (issuer, store) = issuer_in(dir.path());

        let result = issuer.issue("   ", "ada@example.com", 30).await;
        assert!(matches!(result, Err(Error::Issuance(_))));
        assert!(store.list().await.is_empty());
    }

    #[tokio::test]
    async fn issue_rejects_bad_email() {
        let dir = tempfile::tempdir().unwrap();
        let (issuer, _store) = issuer_in(dir.path());

        for email in ["not-an-email", "a@b", "a b@example.com", "@example.com"] {
            let result = issuer.issue("Ada Doe", email, 30).await;
            assert!(matches!(result, Err(Error::Issuance(_))), "accepted {email}");
        }
    }

    #[tokio::test]
    async fn issue_rejects_out_of_range_validity() {
        let dir = tempfile::tempdir().unwrap();
        let (issuer, _store) = issuer_in(dir.path());

        assert!(issuer.issue("Ada Doe", "ada@example.com", 0).await.is_err());
        assert!(
            issuer
                .issue("Ada Doe", "ada@example.com", MAX_VALIDITY_DAYS + 1)
                .await
                .is_err()
        );
        assert!(
            issuer
                .issue("Ada Doe", "ada@example.com", MAX_VALIDITY_DAYS)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn issued_ids_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let (issuer, store) = issuer_in(dir.path());

        let a = issuer.issue("Ada Doe", "ada@example.com", 30).await.unwrap();
        let b = issuer.issue("Ada Doe", "ada@example.com", 30).await.unwrap();
        assert_ne!(a.certificate_id, b.certificate_id);
        assert_eq!(store.list().await.len(), 2);
    }
}
