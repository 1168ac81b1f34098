//! RSA key lifecycle and the small set of cryptographic primitives the
//! catalog pipeline and identity subsystem depend on: 1024-bit key
//! generation, PKCS#1/PKIX PEM import and export, raw un-padded RSA
//! encrypt/decrypt, and SHA-1 hashing.
//!
//! The encrypt/decrypt here is textbook RSA with no OAEP or PKCS#1 v1.5
//! padding, matching already-issued key and certificate material that
//! predates this crate. It is deterministic, which the identity
//! subsystem relies on to re-derive and byte-compare a signature rather
//! than verify it through a padding scheme.

use pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding};
use pkcs8::{DecodePublicKey, EncodePublicKey};
use rand::rngs::OsRng;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Bit length of every key pair this system generates. Matches the
/// already-issued key material it must stay interoperable with.
pub const KEY_BITS: usize = 1024;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("failed to generate a {KEY_BITS}-bit RSA key pair: {0}")]
    KeyGen(rsa::Error),
    #[error("failed to decode PEM private key: {0}")]
    PrivateKeyPem(pkcs1::Error),
    #[error("failed to encode PEM private key: {0}")]
    PrivateKeyEncode(pkcs1::Error),
    #[error("failed to decode PEM public key: {0}")]
    PublicKeyPem(pkcs8::spki::Error),
    #[error("failed to encode PEM public key: {0}")]
    PublicKeyEncode(pkcs8::spki::Error),
    #[error("ciphertext length {len} is not a non-zero multiple of the {key_size}-byte block size")]
    MalformedCiphertext { len: usize, key_size: usize },
    #[error("decrypted length prefix ({declared} bytes) overruns the {available}-byte decoded payload")]
    TruncatedPlaintext { declared: usize, available: usize },
}

/// A generated or loaded key pair.
pub struct KeyPair {
    pub private: RsaPrivateKey,
    pub public: RsaPublicKey,
}

impl KeyPair {
    /// Generates a fresh key pair of [`KEY_BITS`] bits.
    pub fn generate() -> Result<KeyPair, CryptoError> {
        let private = RsaPrivateKey::new(&mut OsRng, KEY_BITS).map_err(CryptoError::KeyGen)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair { private, public })
    }
}

/// Encodes a private key as PKCS#1 PEM (`RSA PRIVATE KEY`).
pub fn export_private_key(key: &RsaPrivateKey) -> Result<String, CryptoError> {
    key.to_pkcs1_pem(LineEnding::LF)
        .map(|doc| doc.to_string())
        .map_err(CryptoError::PrivateKeyEncode)
}

/// Decodes a PKCS#1 PEM private key (`RSA PRIVATE KEY`).
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs1_pem(pem).map_err(CryptoError::PrivateKeyPem)
}

/// Encodes a public key as PKIX PEM. The label is `RSA PUBLIC KEY` even
/// though the body is PKIX `SubjectPublicKeyInfo` DER, matching the
/// already-distributed `undertow.tow` file format.
pub fn export_public_key(key: &RsaPublicKey) -> Result<String, CryptoError> {
    let der = key
        .to_public_key_der()
        .map_err(CryptoError::PublicKeyEncode)?;
    let block = pem::Pem::new("RSA PUBLIC KEY", der.as_bytes().to_vec());
    Ok(pem::encode(&block))
}

/// Decodes a PKIX PEM public key, regardless of whether its PEM label
/// reads `RSA PUBLIC KEY` or `PUBLIC KEY`.
pub fn parse_public_key(input: &str) -> Result<RsaPublicKey, CryptoError> {
    let block = pem::parse(input).map_err(|_| {
        CryptoError::PublicKeyPem(pkcs8::spki::Error::KeyMalformed)
    })?;
    RsaPublicKey::from_public_key_der(block.contents()).map_err(CryptoError::PublicKeyPem)
}

/// Number of bytes at the front of the framed plaintext that record its
/// true length, so trailing zero padding in the final block can be told
/// apart from real data on the way back out.
const LENGTH_PREFIX_BYTES: usize = 4;

/// Raw, un-padded RSA, chunked across as many `key_size`-byte blocks as
/// `plaintext` needs: each block is `ciphertext = plaintext^e mod n`,
/// left-padded with zero bytes to the modulus size. No OAEP or PKCS#1
/// v1.5 padding is applied, so this is deterministic — the same
/// plaintext always produces the same ciphertext under a given key,
/// which is what lets a signature be re-derived and compared
/// byte-for-byte rather than verified through a padding scheme.
///
/// Plaintext is framed as a 4-byte big-endian length followed by the
/// raw bytes before being split into `key_size - 1`-byte blocks (a
/// block of that size is always smaller than the modulus), so decrypt
/// can trim the zero padding a final short block picks up.
pub fn encrypt(public: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key_size = public.size();
    let block_size = key_size - 1;

    let mut framed = Vec::with_capacity(LENGTH_PREFIX_BYTES + plaintext.len());
    framed.extend_from_slice(&(plaintext.len() as u32).to_be_bytes());
    framed.extend_from_slice(plaintext);

    let mut ciphertext = Vec::with_capacity(framed.len().div_ceil(block_size) * key_size);
    for block in framed.chunks(block_size) {
        let m = BigUint::from_bytes_be(block);
        let c = m.modpow(public.e(), public.n());
        ciphertext.extend(to_fixed_be(&c, key_size));
    }
    Ok(ciphertext)
}

/// Inverse of [`encrypt`]: decrypts each `key_size`-byte block with
/// `plaintext = ciphertext^d mod n`, then strips the framing to recover
/// the exact original byte length.
pub fn decrypt(private: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key_size = private.size();
    let block_size = key_size - 1;

    if ciphertext.is_empty() || ciphertext.len() % key_size != 0 {
        return Err(CryptoError::MalformedCiphertext {
            len: ciphertext.len(),
            key_size,
        });
    }

    let mut framed = Vec::with_capacity((ciphertext.len() / key_size) * block_size);
    for block in ciphertext.chunks(key_size) {
        let c = BigUint::from_bytes_be(block);
        let m = c.modpow(private.d(), private.n());
        framed.extend(to_fixed_be(&m, block_size));
    }

    if framed.len() < LENGTH_PREFIX_BYTES {
        return Err(CryptoError::TruncatedPlaintext {
            declared: 0,
            available: framed.len(),
        });
    }
    let declared = u32::from_be_bytes(framed[..LENGTH_PREFIX_BYTES].try_into().unwrap()) as usize;
    let end = LENGTH_PREFIX_BYTES + declared;
    let available = framed.len() - LENGTH_PREFIX_BYTES;
    if end > framed.len() {
        return Err(CryptoError::TruncatedPlaintext { declared, available });
    }
    Ok(framed[LENGTH_PREFIX_BYTES..end].to_vec())
}

fn to_fixed_be(value: &BigUint, size: usize) -> Vec<u8> {
    let mut bytes = value.to_bytes_be();
    if bytes.len() < size {
        let mut padded = vec![0u8; size - bytes.len()];
        padded.append(&mut bytes);
        padded
    } else {
        bytes
    }
}

/// SHA-1 digest of `data`.
pub fn sha1(data: &[u8]) -> [u8; 20] {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keypair_roundtrips_through_pem() {
        let pair = KeyPair::generate().unwrap();
        let pem = export_private_key(&pair.private).unwrap();
        let parsed = parse_private_key(&pem).unwrap();
        assert_eq!(pair.private.to_pkcs1_der().unwrap().as_bytes(), parsed.to_pkcs1_der().unwrap().as_bytes());
    }

    #[test]
    fn public_key_roundtrips_with_rsa_public_key_label() {
        let pair = KeyPair::generate().unwrap();
        let pem = export_public_key(&pair.public).unwrap();
        assert!(pem.starts_with("-----BEGIN RSA PUBLIC KEY-----"));
        let parsed = parse_public_key(&pem).unwrap();
        assert_eq!(pair.public, parsed);
    }

    #[test]
    fn encrypt_then_decrypt_recovers_plaintext() {
        let pair = KeyPair::generate().unwrap();
        let msg = b"hello arkhive";
        let ct = encrypt(&pair.public, msg).unwrap();
        let pt = decrypt(&pair.private, &ct).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn encrypt_is_deterministic() {
        let pair = KeyPair::generate().unwrap();
        let msg = b"same plaintext every time";
        let first = encrypt(&pair.public, msg).unwrap();
        let second = encrypt(&pair.public, msg).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), pair.public.size());
    }

    #[test]
    fn encrypt_then_decrypt_recovers_a_multi_block_plaintext() {
        let pair = KeyPair::generate().unwrap();
        // Bigger than one 127-byte block at 1024 bits, matching a
        // realistic certificate payload (username + email + date +
        // PEM-encoded public key).
        let date: i64 = 1_700_000_000;
        let msg = format!(
            "someone{date}someone@example.com-----BEGIN RSA PUBLIC KEY-----\nMIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQC...\n-----END RSA PUBLIC KEY-----"
        );
        assert!(msg.len() > pair.public.size());

        let ct = encrypt(&pair.public, msg.as_bytes()).unwrap();
        assert_eq!(ct.len() % pair.public.size(), 0);
        assert!(ct.len() > pair.public.size());

        let pt = decrypt(&pair.private, &ct).unwrap();
        assert_eq!(pt, msg.as_bytes());
    }

    #[test]
    fn decrypt_rejects_ciphertext_not_a_multiple_of_block_size() {
        let pair = KeyPair::generate().unwrap();
        let malformed = vec![0u8; pair.public.size() - 1];
        assert!(matches!(
            decrypt(&pair.private, &malformed),
            Err(CryptoError::MalformedCiphertext { .. })
        ));
    }

    #[test]
    fn sha1_matches_known_vector() {
        let digest = sha1(b"abc");
        assert_eq!(
            hex(&digest),
            "a9993e364706816aba3e25717850c26c9cd0d89"
        );
    }

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}
