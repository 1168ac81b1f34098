//! Ordered catalog sources: an encrypted blob + private key, or a plain
//! JSON file. The first importer that reports a changed catalog wins;
//! later importers in the chain are not consulted that round.

use arkhive_model::CatalogDocument;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("crypto error: {0}")]
    Crypto(#[from] arkhive_crypto::CryptoError),
    #[error("catalog JSON in {path} is invalid: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A catalog that an importer decided needed (re-)projection this round.
pub struct ImportedCatalog {
    pub hash: Vec<u8>,
    pub document: CatalogDocument,
}

/// A catalog source in the import chain.
///
/// `import` returns `Ok(None)` when the source is absent or its content
/// hash matches `current_hash`; `Ok(Some(..))` when a catalog was
/// decoded and is ready for projection.
pub trait CatalogImporter {
    fn can_load(&self, base_dir: &Path) -> bool;

    fn import(
        &self,
        base_dir: &Path,
        current_hash: Option<&[u8]>,
    ) -> Result<Option<ImportedCatalog>, ImportError>;
}

fn read_file(path: &Path) -> Result<Vec<u8>, ImportError> {
    std::fs::read(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn decode_document(path: &Path, bytes: &[u8]) -> Result<CatalogDocument, ImportError> {
    serde_json::from_slice(bytes).map_err(|source| ImportError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads `db.honey` (RSA ciphertext) and `private_key.bee` (PKCS#1 PEM),
/// hashing the ciphertext and decrypting only when the hash changed.
pub struct EncryptedImporter;

const CIPHERTEXT_FILE: &str = "db.honey";
const PRIVATE_KEY_FILE: &str = "private_key.bee";

impl CatalogImporter for EncryptedImporter {
    fn can_load(&self, base_dir: &Path) -> bool {
        base_dir.join(CIPHERTEXT_FILE).exists() && base_dir.join(PRIVATE_KEY_FILE).exists()
    }

    fn import(
        &self,
        base_dir: &Path,
        current_hash: Option<&[u8]>,
    ) -> Result<Option<ImportedCatalog>, ImportError> {
        if !self.can_load(base_dir) {
            return Ok(None);
        }

        let key_path = base_dir.join(PRIVATE_KEY_FILE);
        let key_pem = std::fs::read_to_string(&key_path).map_err(|source| ImportError::Io {
            path: key_path.clone(),
            source,
        })?;
        let private_key = arkhive_crypto::parse_private_key(&key_pem)?;

        let cipher_path = base_dir.join(CIPHERTEXT_FILE);
        let ciphertext = read_file(&cipher_path)?;
        let hash = arkhive_crypto::sha1(&ciphertext).to_vec();

        if current_hash == Some(hash.as_slice()) {
            log::debug!("encrypted catalog unchanged, skipping decrypt");
            return Ok(None);
        }

        log::info!("encrypted catalog changed, decrypting");
        let plaintext = arkhive_crypto::decrypt(&private_key, &ciphertext)?;
        let document = decode_document(&cipher_path, &plaintext)?;
        Ok(Some(ImportedCatalog { hash, document }))
    }
}

/// Reads `db.json` directly, hashing the plaintext bytes.
pub struct PlainImporter;

const PLAIN_FILE: &str = "db.json";

impl CatalogImporter for PlainImporter {
    fn can_load(&self, base_dir: &Path) -> bool {
        base_dir.join(PLAIN_FILE).exists()
    }

    fn import(
        &self,
        base_dir: &Path,
        current_hash: Option<&[u8]>,
    ) -> Result<Option<ImportedCatalog>, ImportError> {
        if !self.can_load(base_dir) {
            return Ok(None);
        }

        let path = base_dir.join(PLAIN_FILE);
        let plaintext = read_file(&path)?;
        let hash = arkhive_crypto::sha1(&plaintext).to_vec();

        if current_hash == Some(hash.as_slice()) {
            log::debug!("plain catalog unchanged, skipping parse");
            return Ok(None);
        }

        log::info!("plain catalog changed, parsing");
        let document = decode_document(&path, &plaintext)?;
        Ok(Some(ImportedCatalog { hash, document }))
    }
}

/// Runs the fixed-priority chain (encrypted, then plain) against
/// `base_dir`, returning the first importer's result that isn't `None`.
pub fn import_catalog(
    base_dir: &Path,
    current_hash: Option<&[u8]>,
) -> Result<Option<ImportedCatalog>, ImportError> {
    let chain: Vec<Box<dyn CatalogImporter>> = vec![Box::new(EncryptedImporter), Box::new(PlainImporter)];

    for importer in &chain {
        if let Some(result) = importer.import(base_dir, current_hash)? {
            return Ok(Some(result));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_importer_reports_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(PlainImporter.import(dir.path(), None).unwrap().is_none());
    }

    #[test]
    fn plain_importer_skips_unchanged_hash() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PLAIN_FILE), b"{}").unwrap();
        let hash = arkhive_crypto::sha1(b"{}").to_vec();
        assert!(
            PlainImporter
                .import(dir.path(), Some(&hash))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn plain_importer_decodes_changed_catalog() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PLAIN_FILE), b"{}").unwrap();
        let result = PlainImporter.import(dir.path(), None).unwrap().unwrap();
        assert!(result.document.consoles.is_empty());
    }

    #[test]
    fn encrypted_importer_round_trips_through_decrypt() {
        let dir = tempfile::tempdir().unwrap();
        let pair = arkhive_crypto::KeyPair::generate().unwrap();
        let pem = arkhive_crypto::export_private_key(&pair.private).unwrap();
        std::fs::write(dir.path().join(PRIVATE_KEY_FILE), pem).unwrap();

        let plaintext = br#"{"consoles":{}}"#;
        let ciphertext = arkhive_crypto::encrypt(&pair.public, plaintext).unwrap();
        std::fs::write(dir.path().join(CIPHERTEXT_FILE), &ciphertext).unwrap();

        let result = EncryptedImporter.import(dir.path(), None).unwrap().unwrap();
        assert!(result.document.consoles.is_empty());
        assert_eq!(result.hash, arkhive_crypto::sha1(&ciphertext).to_vec());
    }

    #[test]
    fn chain_prefers_encrypted_over_plain() {
        let dir = tempfile::tempdir().unwrap();
        let pair = arkhive_crypto::KeyPair::generate().unwrap();
        let pem = arkhive_crypto::export_private_key(&pair.private).unwrap();
        std::fs::write(dir.path().join(PRIVATE_KEY_FILE), pem).unwrap();
        let ciphertext = arkhive_crypto::encrypt(&pair.public, b"{}").unwrap();
        std::fs::write(dir.path().join(CIPHERTEXT_FILE), &ciphertext).unwrap();
        std::fs::write(dir.path().join(PLAIN_FILE), b"{}").unwrap();

        let result = import_catalog(dir.path(), None).unwrap().unwrap();
        assert_eq!(result.hash, arkhive_crypto::sha1(&ciphertext).to_vec());
    }
}
