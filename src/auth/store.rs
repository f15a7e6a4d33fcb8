//! Certificate store — the durable source of truth for revocation.
//!
//! The [`CertificateStore`] trait abstracts over storage backends. The
//! shipped implementation is [`FileCertificateStore`]: a `DashMap` index for
//! lock-free reads, write-through persisted as a JSON file with an atomic
//! temp-file + rename so a crash mid-write never leaves a torn store.
//!
//! Records are never physically deleted: revocation flips the `is_active`
//! flag one way, and the flag is consulted on every verification.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{Error, Result};

/// Durable counterpart of an issued certificate, keyed by `certificate_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// Unique certificate identifier
    pub certificate_id: String,
    /// Client name the certificate was issued to
    pub client_name: String,
    /// Client email address
    pub client_email: String,
    /// Issuance timestamp
    pub issued_at: DateTime<Utc>,
    /// Expiry timestamp
    pub expires_at: DateTime<Utc>,
    /// Active flag — true at issuance, flipped false on revocation, never back
    pub is_active: bool,
    /// When the certificate was revoked, if it was
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    /// The full signed certificate string, kept for administrative display
    pub signed_certificate: String,
}

/// Outcome of a revocation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The record is revoked (idempotent: also returned when it already was)
    Revoked,
    /// No record exists for the given identifier
    NotFound,
}

/// Trait abstracting the certificate record storage backend.
///
/// Implementations must be `Send + Sync`: the store is shared across
/// concurrent request handlers.
#[async_trait::async_trait]
pub trait CertificateStore: Send + Sync + 'static {
    /// Insert a newly issued record.
    ///
    /// The insert is durable before this returns; on persistence failure no
    /// trace of the record remains (issuance must not produce a certificate
    /// without a stored record). A duplicate `certificate_id` is an error:
    /// records are never replaced, so a revoked record can never be flipped
    /// back to active by a re-insert.
    async fn put(&self, record: CertificateRecord) -> Result<()>;

    /// Look up a record by certificate identifier.
    async fn get(&self, certificate_id: &str) -> Option<CertificateRecord>;

    /// All records ordered by issuance time, most recent first.
    async fn list(&self) -> Vec<CertificateRecord>;

    /// Revoke a record. Idempotent: revoking an already-revoked record
    /// succeeds without error.
    async fn revoke(&self, certificate_id: &str) -> Result<RevokeOutcome>;
}

/// File-backed certificate store.
///
/// Reads are served from the `DashMap` index; `put` and `revoke` mutate the
/// index first (immediately visible to concurrent verifications) and then
/// persist a full snapshot under a mutex so file writes never interleave.
pub struct FileCertificateStore {
    records: DashMap<String, CertificateRecord>,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCertificateStore {
    /// Open the store at `path`, loading any existing records.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing store file cannot be read or parsed,
    /// or the parent directory cannot be created.
    pub fn open(path: &Path) -> Result<Arc<Self>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Store(format!("Cannot create '{}': {e}", parent.display()))
            })?;
        }

        let records = DashMap::new();
        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| Error::Store(format!("Cannot read '{}': {e}", path.display())))?;
            let loaded: Vec<CertificateRecord> = serde_json::from_str(&content)
                .map_err(|e| Error::Store(format!("Cannot parse '{}': {e}", path.display())))?;
            info!(count = loaded.len(), path = %path.display(), "Loaded certificate records");
            for record in loaded {
                records.insert(record.certificate_id.clone(), record);
            }
        }

        Ok(Arc::new(Self {
            records,
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        }))
    }

    /// Persist the full record set as JSON, via temp file + rename.
    async fn persist(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut snapshot: Vec<CertificateRecord> =
            self.records.iter().map(|e| e.value().clone()).collect();
        snapshot.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));

        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::Store(format!("Cannot serialize records: {e}")))?;

        let mut tmp_name = self.path.file_name().map_or_else(
            || std::ffi::OsString::from("store.tmp"),
            std::ffi::OsStr::to_os_string,
        );
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        fs::write(&tmp, json)
            .map_err(|e| Error::Store(format!("Cannot write '{}': {e}", tmp.display())))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600));
        }

        fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Store(format!("Cannot move store into place: {e}")))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl CertificateStore for FileCertificateStore {
    async fn put(&self, record: CertificateRecord) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        let id = record.certificate_id.clone();
        match self.records.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(Error::Store(format!(
                    "Certificate record '{id}' already exists"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
        }

        if let Err(e) = self.persist().await {
            // Roll back: a certificate must not exist without a durable record
            self.records.remove(&id);
            return Err(e);
        }
        debug!(certificate_id = %id, "Stored certificate record");
        Ok(())
    }

    async fn get(&self, certificate_id: &str) -> Option<CertificateRecord> {
        self.records.get(certificate_id).map(|e| e.value().clone())
    }

    async fn list(&self) -> Vec<CertificateRecord> {
        let mut records: Vec<CertificateRecord> =
            self.records.iter().map(|e| e.value().clone()).collect();
        records.sort_by(|a, b| b.issued_at.cmp(&a.issued_at));
        records
    }

    async fn revoke(&self, certificate_id: &str) -> Result<RevokeOutcome> {
        {
            let Some(mut entry) = self.records.get_mut(certificate_id) else {
                return Ok(RevokeOutcome::NotFound);
            };
            // Monotonic: the flag never flips back, and a repeat revoke keeps
            // the original revocation timestamp.
            if entry.is_active {
                entry.is_active = false;
                entry.revoked_at = Some(Utc::now());
            }
        } // entry guard dropped before the snapshot iterates the map

        self.persist().await?;
        info!(certificate_id = %certificate_id, "Revoked certificate");
        Ok(RevokeOutcome::Revoked)
    }
}
