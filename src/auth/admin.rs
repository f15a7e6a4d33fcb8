//! Admin authority — the separate trust boundary for management operations.
//!
//! Certificate issuance, listing, and revocation are gated by a static
//! shared secret, not by a client certificate. The comparison is constant
//! time (`subtle`) so the check leaks nothing about the secret's length or
//! matching prefix.

use subtle::ConstantTimeEq;

/// Gate for the certificate management operations.
#[derive(Clone)]
pub struct AdminAuthority {
    secret: Option<String>,
}

impl AdminAuthority {
    /// Create the authority from the resolved admin secret.
    ///
    /// `None` disables the management endpoints entirely (they respond
    /// 503 until a secret is configured).
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Whether a secret is configured at all.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    /// Check a presented secret in constant time.
    ///
    /// Always `false` when no secret is configured.
    #[must_use]
    pub fn authorize(&self, presented: &str) -> bool {
        self.secret
            .as_ref()
            .is_some_and(|s| presented.as_bytes().ct_eq(s.as_bytes()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_secret_is_authorized() {
        let admin = AdminAuthority::new(Some("workshop-secret".to_string()));
        assert!(admin.authorize("workshop-secret"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let admin = AdminAuthority::new(Some("workshop-secret".to_string()));
        assert!(!admin.authorize("workshop-secre"));
        assert!(!admin.authorize("workshop-secret2"));
        assert!(!admin.authorize(""));
    }

    #[test]
    fn unconfigured_authority_rejects_everything() {
        let admin = AdminAuthority::new(None);
        assert!(!admin.is_configured());
        assert!(!admin.authorize(""));
        assert!(!admin.authorize("anything"));
    }
}
