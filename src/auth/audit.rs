//! Audit logging for certificate lifecycle events.
//!
//! Every event is emitted via `tracing::info!` with a structured JSON
//! payload, making the trail queryable by any log aggregator.
//!
//! # Events
//!
//! | Event | When |
//! |-------|------|
//! | `certificate.issued` | A new certificate is minted and its record stored |
//! | `certificate.verified` | A presented certificate passes all checks |
//! | `certificate.denied` | A presented certificate fails any check |
//! | `certificate.revoked` | A certificate is revoked by the admin |

use serde::Serialize;

use super::certificate::AuthenticatedIdentity;

/// Structured audit event for a certificate lifecycle transition.
#[derive(Debug, Serialize)]
pub struct AuditEvent {
    /// Event type string (e.g., `"certificate.issued"`)
    pub event: &'static str,
    /// Certificate identifier, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_id: Option<String>,
    /// Client name, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    /// Client email, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_email: Option<String>,
    /// Human-readable reason for denial events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    /// Construct a `certificate.issued` event.
    #[must_use]
    pub fn issued(certificate_id: &str, client_name: &str, client_email: &str) -> Self {
        Self {
            event: "certificate.issued",
            certificate_id: Some(certificate_id.to_string()),
            client_name: Some(client_name.to_string()),
            client_email: Some(client_email.to_string()),
            reason: None,
        }
    }

    /// Construct a `certificate.verified` event.
    #[must_use]
    pub fn verified(identity: &AuthenticatedIdentity) -> Self {
        Self {
            event: "certificate.verified",
            certificate_id: Some(identity.certificate_id.clone()),
            client_name: Some(identity.client_name.clone()),
            client_email: None,
            reason: None,
        }
    }

    /// Construct a `certificate.denied` event.
    #[must_use]
    pub fn denied(reason: impl Into<String>) -> Self {
        Self {
            event: "certificate.denied",
            certificate_id: None,
            client_name: None,
            client_email: None,
            reason: Some(reason.into()),
        }
    }

    /// Construct a `certificate.revoked` event.
    #[must_use]
    pub fn revoked(certificate_id: &str) -> Self {
        Self {
            event: "certificate.revoked",
            certificate_id: Some(certificate_id.to_string()),
            client_name: None,
            client_email: None,
            reason: None,
        }
    }
}

/// Emit an audit event through the tracing pipeline.
pub fn emit(event: &AuditEvent) {
    match serde_json::to_string(event) {
        Ok(ref json) => tracing::info!(audit = %json, "certificate audit"),
        Err(ref e) => tracing::warn!(error = %e, "Failed to serialize audit event"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_event_has_correct_type() {
        let event = AuditEvent::issued("cert-1", "Ada Doe", "ada@example.com");
        assert_eq!(event.event, "certificate.issued");
        assert_eq!(event.certificate_id.as_deref(), Some("cert-1"));
        assert_eq!(event.client_email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn denied_event_contains_reason() {
        let event = AuditEvent::denied("certificate has expired");
        assert_eq!(event.event, "certificate.denied");
        assert_eq!(event.reason.as_deref(), Some("certificate has expired"));
        assert!(event.certificate_id.is_none());
    }

    #[test]
    fn events_serialize_to_json() {
        let identity = AuthenticatedIdentity {
            client_name: "Ada Doe".to_string(),
            client_email: "ada@example.com".to_string(),
            certificate_id: "cert-1".to_string(),
        };
        let events = vec![
            AuditEvent::issued("cert-1", "Ada Doe", "ada@example.com"),
            AuditEvent::verified(&identity),
            AuditEvent::denied("test"),
            AuditEvent::revoked("cert-1"),
        ];
        for event in events {
            assert!(serde_json::to_string(&event).is_ok());
        }
    }

    #[test]
    fn emit_does_not_panic() {
        emit(&AuditEvent::revoked("cert-1"));
    }
}
