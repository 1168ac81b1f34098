//! User identity lifecycle: private key generation/loading, and
//! certificate verification against the publisher's public key
//! ("undertow").
//!
//! Verification is not a standard RSA signature check — it RSA-encrypts
//! the canonical certificate payload with the publisher's public key
//! and compares the result byte-for-byte against the certificate's
//! stored `sign` field. This is bit-exact with already-issued
//! certificates and is kept exactly as-is rather than "fixed" to use a
//! conventional signature scheme.

use arkhive_crypto::CryptoError;
use arkhive_model::CertificateDocument;
use base64::Engine;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::path::{Path, PathBuf};
use thiserror::Error;

const PRIVATE_KEY_FILE: &str = "private.bee";
const CERTIFICATE_FILE: &str = "certificate.bee";
const UNDERTOW_FILE: &str = "undertow.tow";

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("certificate at {path} is not valid JSON: {source}")]
    CertificateJson {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("certificate public_key field is not valid base64url")]
    BadPublicKeyEncoding,
    #[error("certificate sign field is not valid base64url")]
    BadSignEncoding,
}

/// States a user's identity can be in, strictly forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CertificateStatus {
    Invalid,
    Available,
    Unofficial,
    Official,
}

impl CertificateStatus {
    fn rank(self) -> u8 {
        match self {
            CertificateStatus::Invalid => 0,
            CertificateStatus::Available => 1,
            CertificateStatus::Unofficial => 2,
            CertificateStatus::Official => 3,
        }
    }
}

/// The user's loaded identity: private key, optional certificate, and
/// current verification status.
pub struct Identity {
    private_key: RsaPrivateKey,
    certificate: Option<CertificateDocument>,
    status: CertificateStatus,
}

impl Identity {
    pub fn status(&self) -> CertificateStatus {
        self.status
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn certificate(&self) -> Option<&CertificateDocument> {
        self.certificate.as_ref()
    }

    fn set_status(&mut self, next: CertificateStatus) {
        debug_assert!(
            next.rank() >= self.status.rank(),
            "identity status must move forward: {:?} -> {:?}",
            self.status,
            next
        );
        self.status = next;
    }

    /// Loads the private key and certificate from `system_dir` if both
    /// are present, or generates and persists a fresh key pair and
    /// writes a bootstrap `undertow.tow` public key otherwise.
    pub fn boot(system_dir: &Path) -> Result<Identity, IdentityError> {
        std::fs::create_dir_all(system_dir).map_err(|source| IdentityError::Io {
            path: system_dir.to_path_buf(),
            source,
        })?;

        let key_path = system_dir.join(PRIVATE_KEY_FILE);
        let cert_path = system_dir.join(CERTIFICATE_FILE);

        if key_path.exists() && cert_path.exists() {
            let private_key = load_private_key(&key_path)?;
            let certificate = load_certificate(&cert_path)?;
            log::info!("loaded existing identity for {}", certificate.username);
            return Ok(Identity {
                private_key,
                certificate: Some(certificate),
                status: CertificateStatus::Available,
            });
        }

        log::info!("no usable identity found, generating a new key pair");
        let pair = arkhive_crypto::KeyPair::generate()?;
        let pem = arkhive_crypto::export_private_key(&pair.private)?;
        std::fs::write(&key_path, pem).map_err(|source| IdentityError::Io {
            path: key_path.clone(),
            source,
        })?;

        let undertow_path = system_dir.join(UNDERTOW_FILE);
        let public_pem = arkhive_crypto::export_public_key(&pair.public)?;
        std::fs::write(&undertow_path, public_pem).map_err(|source| IdentityError::Io {
            path: undertow_path,
            source,
        })?;

        Ok(Identity {
            private_key: pair.private,
            certificate: None,
            status: CertificateStatus::Invalid,
        })
    }

    /// Verifies the loaded certificate against the publisher's public
    /// key. Moves to `Unofficial` if a signature is present but doesn't
    /// match, `Official` if it does.
    pub fn verify_against_undertow(
        &mut self,
        undertow_public_key: &RsaPublicKey,
    ) -> Result<(), IdentityError> {
        let Some(certificate) = self.certificate.clone() else {
            return Ok(());
        };

        self.set_status(CertificateStatus::Unofficial);

        let Some(sign_b64) = &certificate.sign else {
            return Ok(());
        };
        let stored_sign = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(sign_b64)
            .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(sign_b64))
            .map_err(|_| IdentityError::BadSignEncoding)?;

        let payload = canonical_payload(&certificate);
        let computed = arkhive_crypto::encrypt(undertow_public_key, &payload)?;

        if computed == stored_sign {
            self.set_status(CertificateStatus::Official);
        }
        Ok(())
    }
}

/// The exact byte sequence signed by the publisher: username, email,
/// date, and public_key concatenated in document order.
fn canonical_payload(certificate: &CertificateDocument) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(certificate.username.as_bytes());
    payload.extend_from_slice(certificate.email.as_bytes());
    payload.extend_from_slice(certificate.date.to_string().as_bytes());
    payload.extend_from_slice(certificate.public_key.as_bytes());
    payload
}

fn load_private_key(path: &Path) -> Result<RsaPrivateKey, IdentityError> {
    let pem = std::fs::read_to_string(path).map_err(|source| IdentityError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(arkhive_crypto::parse_private_key(&pem)?)
}

fn load_certificate(path: &Path) -> Result<CertificateDocument, IdentityError> {
    let bytes = std::fs::read(path).map_err(|source| IdentityError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| IdentityError::CertificateJson {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boot_generates_key_and_undertow_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let identity = Identity::boot(dir.path()).unwrap();
        assert_eq!(identity.status(), CertificateStatus::Invalid);
        assert!(dir.path().join(PRIVATE_KEY_FILE).exists());
        assert!(dir.path().join(UNDERTOW_FILE).exists());
    }

    #[test]
    fn boot_loads_existing_identity() {
        let dir = tempfile::tempdir().unwrap();
        let pair = arkhive_crypto::KeyPair::generate().unwrap();
        let pem = arkhive_crypto::export_private_key(&pair.private).unwrap();
        std::fs::write(dir.path().join(PRIVATE_KEY_FILE), pem).unwrap();

        let cert = CertificateDocument {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            date: 1_700_000_000,
            public_key: "abc".to_string(),
            sign: None,
        };
        std::fs::write(
            dir.path().join(CERTIFICATE_FILE),
            serde_json::to_vec(&cert).unwrap(),
        )
        .unwrap();

        let identity = Identity::boot(dir.path()).unwrap();
        assert_eq!(identity.status(), CertificateStatus::Available);
        assert_eq!(identity.certificate().unwrap().username, "alice");
    }

    #[test]
    fn verify_reaches_official_on_matching_signature() {
        let undertow = arkhive_crypto::KeyPair::generate().unwrap();

        let cert = CertificateDocument {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            date: 1_700_000_000,
            public_key: "abc".to_string(),
            sign: None,
        };
        let payload = canonical_payload(&cert);
        let sign = arkhive_crypto::encrypt(&undertow.public, &payload).unwrap();
        let cert = CertificateDocument {
            sign: Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&sign)),
            ..cert
        };

        let dir = tempfile::tempdir().unwrap();
        let pair = arkhive_crypto::KeyPair::generate().unwrap();
        let pem = arkhive_crypto::export_private_key(&pair.private).unwrap();
        std::fs::write(dir.path().join(PRIVATE_KEY_FILE), pem).unwrap();
        std::fs::write(
            dir.path().join(CERTIFICATE_FILE),
            serde_json::to_vec(&cert).unwrap(),
        )
        .unwrap();

        let mut identity = Identity::boot(dir.path()).unwrap();
        identity.verify_against_undertow(&undertow.public).unwrap();
        assert_eq!(identity.status(), CertificateStatus::Official);
    }

    #[test]
    fn verify_stays_unofficial_on_mismatched_signature() {
        let undertow = arkhive_crypto::KeyPair::generate().unwrap();
        let wrong_undertow = arkhive_crypto::KeyPair::generate().unwrap();

        let cert = CertificateDocument {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            date: 1_700_000_000,
            public_key: "abc".to_string(),
            sign: None,
        };
        let payload = canonical_payload(&cert);
        let sign = arkhive_crypto::encrypt(&wrong_undertow.public, &payload).unwrap();
        let cert = CertificateDocument {
            sign: Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&sign)),
            ..cert
        };

        let dir = tempfile::tempdir().unwrap();
        let pair = arkhive_crypto::KeyPair::generate().unwrap();
        let pem = arkhive_crypto::export_private_key(&pair.private).unwrap();
        std::fs::write(dir.path().join(PRIVATE_KEY_FILE), pem).unwrap();
        std::fs::write(
            dir.path().join(CERTIFICATE_FILE),
            serde_json::to_vec(&cert).unwrap(),
        )
        .unwrap();

        let mut identity = Identity::boot(dir.path()).unwrap();
        identity.verify_against_undertow(&undertow.public).unwrap();
        assert_eq!(identity.status(), CertificateStatus::Unofficial);
    }
}
