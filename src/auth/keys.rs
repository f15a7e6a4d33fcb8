//! Key authority — the process-lifetime signing key pair.
//!
//! On first run an ECDSA P-256 key pair is generated with `rcgen` and
//! persisted as `signer.key` (PKCS#8 private PEM) and `signer.pub`
//! (SPKI public PEM) under the configured keys directory. Subsequent runs
//! load the same pair, so previously issued certificates stay verifiable.
//!
//! Writes are atomic (temp file + rename): a partially written key file
//! would invalidate every previously issued certificate.

use std::fs;
use std::path::Path;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::info;

use crate::{Error, Result};

/// Private key file name (PKCS#8 PEM)
const PRIVATE_KEY_FILE: &str = "signer.key";
/// Public key file name (SPKI PEM)
const PUBLIC_KEY_FILE: &str = "signer.pub";

/// Signing algorithm for all certificates
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::ES256;

/// Holder of the signing key pair used to produce and verify all certificates.
///
/// Constructed once at startup via [`KeyAuthority::initialize`] and threaded
/// by reference into the issuer and verifier — no ambient singleton.
pub struct KeyAuthority {
    encoding: EncodingKey,
    decoding: DecodingKey,
    public_pem: String,
}

impl KeyAuthority {
    /// Load the key pair from `keys_dir`, generating and persisting a new one
    /// if none exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyInit`] if generation, persistence, or parsing
    /// fails, or if the stored pair fails the sign/verify self-test. This is
    /// fatal: the caller must abort startup.
    pub fn initialize(keys_dir: &Path) -> Result<Self> {
        let private_path = keys_dir.join(PRIVATE_KEY_FILE);
        let public_path = keys_dir.join(PUBLIC_KEY_FILE);

        let (private_pem, public_pem) = if private_path.exists() && public_path.exists() {
            let private_pem = fs::read_to_string(&private_path).map_err(|e| {
                Error::KeyInit(format!("Cannot read '{}': {e}", private_path.display()))
            })?;
            let public_pem = fs::read_to_string(&public_path).map_err(|e| {
                Error::KeyInit(format!("Cannot read '{}': {e}", public_path.display()))
            })?;
            info!(dir = %keys_dir.display(), "Loaded existing signing key pair");
            (private_pem, public_pem)
        } else {
            let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)
                .map_err(|e| Error::KeyInit(format!("Key generation failed: {e}")))?;
            let private_pem = key_pair.serialize_pem();
            let public_pem = key_pair.public_key_pem();

            fs::create_dir_all(keys_dir).map_err(|e| {
                Error::KeyInit(format!("Cannot create '{}': {e}", keys_dir.display()))
            })?;
            write_atomic(&private_path, private_pem.as_bytes(), true)?;
            write_atomic(&public_path, public_pem.as_bytes(), false)?;
            info!(dir = %keys_dir.display(), "Generated and saved new signing key pair");
            (private_pem, public_pem)
        };

        let encoding = EncodingKey::from_ec_pem(private_pem.as_bytes())
            .map_err(|e| Error::KeyInit(format!("Invalid private key: {e}")))?;
        let decoding = DecodingKey::from_ec_pem(public_pem.as_bytes())
            .map_err(|e| Error::KeyInit(format!("Invalid public key: {e}")))?;

        let authority = Self {
            encoding,
            decoding,
            public_pem,
        };
        authority.self_test()?;
        Ok(authority)
    }

    /// Sign a claims payload, producing the compact signed certificate string.
    pub fn sign_claims<T: Serialize>(&self, claims: &T) -> Result<String> {
        jsonwebtoken::encode(&Header::new(SIGNING_ALGORITHM), claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Signing failed: {e}")))
    }

    /// Decode and signature-verify a signed certificate string.
    ///
    /// Expiry is intentionally **not** validated here — the verifier checks
    /// the `expires_at` claim explicitly so failures surface in a fixed
    /// order (signature before expiry before revocation).
    pub fn decode_claims<T: DeserializeOwned>(
        &self,
        certificate: &str,
    ) -> std::result::Result<TokenData<T>, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<T>(certificate, &self.decoding, &claims_validation())
    }

    /// The public verification key in SPKI PEM form.
    #[must_use]
    pub fn public_key_pem(&self) -> &str {
        &self.public_pem
    }

    /// Round-trip a probe payload to confirm the loaded pair matches.
    /// Catches a corrupted or mismatched key file at startup instead of at
    /// first request.
    fn self_test(&self) -> Result<()> {
        #[derive(Serialize, Deserialize)]
        struct Probe {
            ping: String,
        }

        let signed = self.sign_claims(&Probe {
            ping: "ok".to_string(),
        })?;
        self.decode_claims::<Probe>(&signed)
            .map_err(|e| Error::KeyInit(format!("Key pair self-test failed: {e}")))?;
        Ok(())
    }
}

/// Validation settings shared by the self-test and the verifier: ES256 only,
/// no built-in `exp`/`aud` checks, no required registered claims.
pub(crate) fn claims_validation() -> Validation {
    let mut validation = Validation::new(SIGNING_ALGORITHM);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.set_required_spec_claims::<&str>(&[]);
    validation
}

/// Write `contents` to `path` atomically (temp sibling + rename).
fn write_atomic(path: &Path, contents: &[u8], restrict: bool) -> Result<()> {
    let mut tmp_name = path.file_name().map_or_else(
        || std::ffi::OsString::from("key.tmp"),
        std::ffi::OsStr::to_os_string,
    );
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, contents)
        .map_err(|e| Error::KeyInit(format!("Cannot write '{}': {e}", tmp.display())))?;

    #[cfg(unix)]
    if restrict {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(&tmp, perms)
            .map_err(|e| Error::KeyInit(format!("Cannot restrict '{}': {e}", tmp.display())))?;
    }
    #[cfg(not(unix))]
    let _ = restrict;

    fs::rename(&tmp, path)
        .map_err(|e| Error::KeyInit(format!("Cannot move key into place: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestClaims {
        subject: String,
    }

    #[test]
    fn initialize_generates_key_files() {
        let dir = tempfile::tempdir().unwrap();
        let _authority = KeyAuthority::initialize(dir.path()).unwrap();

        assert!(dir.path().join(PRIVATE_KEY_FILE).exists());
        assert!(dir.path().join(PUBLIC_KEY_FILE).exists());
        // No leftover temp files from the atomic write
        assert!(!dir.path().join("signer.key.tmp").exists());
        assert!(!dir.path().join("signer.pub.tmp").exists());
    }

    #[test]
    fn initialize_is_stable_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let first = KeyAuthority::initialize(dir.path()).unwrap();
        let signed = first
            .sign_claims(&TestClaims {
                subject: "ada".to_string(),
            })
            .unwrap();

        // Second initialization loads the same pair, so the old signature
        // still verifies.
        let second = KeyAuthority::initialize(dir.path()).unwrap();
        let decoded = second.decode_claims::<TestClaims>(&signed).unwrap();
        assert_eq!(decoded.claims.subject, "ada");
        assert_eq!(first.public_key_pem(), second.public_key_pem());
    }

    #[test]
    fn sign_and_decode_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let authority = KeyAuthority::initialize(dir.path()).unwrap();

        let claims = TestClaims {
            subject: "round-trip".to_string(),
        };
        let signed = authority.sign_claims(&claims).unwrap();
        let decoded = authority.decode_claims::<TestClaims>(&signed).unwrap();
        assert_eq!(decoded.claims, claims);
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let authority_a = KeyAuthority::initialize(dir_a.path()).unwrap();
        let authority_b = KeyAuthority::initialize(dir_b.path()).unwrap();

        let signed = authority_a
            .sign_claims(&TestClaims {
                subject: "ada".to_string(),
            })
            .unwrap();

        assert!(authority_b.decode_claims::<TestClaims>(&signed).is_err());
    }

    #[test]
    fn corrupted_private_key_fails_initialization() {
        let dir = tempfile::tempdir().unwrap();
        let _ = KeyAuthority::initialize(dir.path()).unwrap();

        std::fs::write(dir.path().join(PRIVATE_KEY_FILE), "not a pem key").unwrap();
        let result = KeyAuthority::initialize(dir.path());
        assert!(matches!(result, Err(Error::KeyInit(_))));
    }

    #[cfg(unix)]
    #[test]
    fn private_key_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let _ = KeyAuthority::initialize(dir.path()).unwrap();

        let mode = std::fs::metadata(dir.path().join(PRIVATE_KEY_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
