// ============================================
// File: crates/vanet-crypto/src/keys.rs
// ============================================
//! # Cryptographic Key Types
//!
//! ## Creation Reason
//! Defines the vehicle's operational signing key and the public keys of
//! peers and certificate issuers, across every supported signature
//! algorithm, with secure cleanup of private material.
//!
//! ## Main Functionality
//! - `SignatureAlgorithm`: ECDSA (secp256k1), RSA-PSS, Ed25519
//! - `PrivateKey`: Operational signing key (generate, load, sign, export)
//! - `PublicKey`: Verification key bound to its SPKI DER encoding
//!
//! ## Key Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │  PrivateKey (per vehicle)                                  │
//! │  ├─ Generated at initialisation or loaded from PKCS#8      │
//! │  ├─ Signs payload ‖ timestamp ‖ sequence                   │
//! │  └─ Zeroized on drop by the underlying primitive           │
//! │                                                            │
//! │  PublicKey (self, peers, issuers)                          │
//! │  ├─ Travels as SubjectPublicKeyInfo DER                    │
//! │  └─ Verification never errors, it answers true/false       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Private keys must never be logged; `Debug` only shows the algorithm
//! - RSA moduli below 2048 bits are rejected on generate AND on load
//! - All signatures hash with SHA-256 internally
//!
//! ## Last Modified
//! v0.1.0 - Initial key type definitions

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::{Signer as _, Verifier as _};
use pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rand::rngs::OsRng;
use rsa::signature::{RandomizedSigner as _, SignatureEncoding as _, Verifier as _};
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{CryptoError, Result};

// ============================================
// Constants
// ============================================

/// Minimum accepted RSA modulus size in bits.
pub const MIN_RSA_MODULUS_BITS: usize = 2048;

/// Default RSA modulus size in bits.
pub const DEFAULT_RSA_MODULUS_BITS: usize = 2048;

// ============================================
// SignatureAlgorithm
// ============================================

/// Signature scheme used for the vehicle's operational key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAlgorithm {
    /// ECDSA over secp256k1 with SHA-256. Smallest signatures.
    #[default]
    Ecdsa,
    /// RSASSA-PSS with SHA-256.
    RsaPss,
    /// Ed25519.
    Ed25519,
}

impl SignatureAlgorithm {
    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ecdsa => "ecdsa",
            Self::RsaPss => "rsa-pss",
            Self::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ecdsa" | "secp256k1" => Ok(Self::Ecdsa),
            "rsa-pss" | "rsa_pss" | "rsa" => Ok(Self::RsaPss),
            "ed25519" => Ok(Self::Ed25519),
            other => Err(CryptoError::unsupported(format!("signature algorithm '{other}'"))),
        }
    }
}

// ============================================
// PrivateKey
// ============================================

enum SigningInner {
    Ecdsa(k256::ecdsa::SigningKey),
    RsaPss(rsa::RsaPrivateKey),
    Ed25519(ed25519_dalek::SigningKey),
}

/// The vehicle's operational signing key.
///
/// # Security
/// - Key material is zeroized on drop by each primitive's own `Drop`
/// - Loaded file buffers are wrapped in `Zeroizing`
///
/// # Example
/// ```
/// use vanet_crypto::keys::{PrivateKey, SignatureAlgorithm};
///
/// let key = PrivateKey::generate(SignatureAlgorithm::Ecdsa, 2048).unwrap();
/// let public = key.public_key().unwrap();
///
/// let sig = key.sign(b"hello").unwrap();
/// assert!(public.verify(b"hello", &sig));
/// assert!(!public.verify(b"hellO", &sig));
/// ```
pub struct PrivateKey {
    inner: SigningInner,
}

impl PrivateKey {
    /// Generates a fresh key pair.
    ///
    /// # Arguments
    /// * `algorithm` - Signature scheme
    /// * `rsa_bits` - Modulus size, only consulted for RSA-PSS
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the modulus is below
    /// [`MIN_RSA_MODULUS_BITS`] or the primitive fails.
    pub fn generate(algorithm: SignatureAlgorithm, rsa_bits: usize) -> Result<Self> {
        let inner = match algorithm {
            SignatureAlgorithm::Ecdsa => {
                SigningInner::Ecdsa(k256::ecdsa::SigningKey::random(&mut OsRng))
            }
            SignatureAlgorithm::RsaPss => {
                if rsa_bits < MIN_RSA_MODULUS_BITS {
                    return Err(CryptoError::key_generation(format!(
                        "RSA modulus of {rsa_bits} bits is below the {MIN_RSA_MODULUS_BITS}-bit minimum"
                    )));
                }
                let key = rsa::RsaPrivateKey::new(&mut OsRng, rsa_bits)
                    .map_err(|e| CryptoError::key_generation(format!("RSA: {e}")))?;
                SigningInner::RsaPss(key)
            }
            SignatureAlgorithm::Ed25519 => {
                SigningInner::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
            }
        };
        Ok(Self { inner })
    }

    /// Parses a PKCS#8 DER private key of any supported algorithm.
    ///
    /// # Errors
    /// Returns `KeyLoad` if no supported algorithm accepts the encoding,
    /// or if an RSA modulus is too small.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        if let Ok(key) = ed25519_dalek::SigningKey::from_pkcs8_der(der) {
            return Ok(Self { inner: SigningInner::Ed25519(key) });
        }
        if let Ok(key) = k256::ecdsa::SigningKey::from_pkcs8_der(der) {
            return Ok(Self { inner: SigningInner::Ecdsa(key) });
        }
        if let Ok(key) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
            check_rsa_size(key.size())?;
            return Ok(Self { inner: SigningInner::RsaPss(key) });
        }
        Err(CryptoError::key_load("unrecognised PKCS#8 private key"))
    }

    /// Parses a PKCS#8 PEM private key of any supported algorithm.
    ///
    /// # Errors
    /// Returns `KeyLoad` if the PEM is malformed or unsupported.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        let (label, doc) = pkcs8::SecretDocument::from_pem(pem)
            .map_err(|e| CryptoError::key_load(format!("invalid PEM: {e}")))?;
        if label != "PRIVATE KEY" {
            return Err(CryptoError::key_load(format!("unexpected PEM label '{label}'")));
        }
        Self::from_pkcs8_der(doc.as_bytes())
    }

    /// Loads a PKCS#8 private key (PEM or DER) from a file.
    ///
    /// # Errors
    /// Returns `KeyLoad` if the file is unreadable or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = read_secret_file(path)?;
        let key = if looks_like_pem(&raw) {
            let text = std::str::from_utf8(&raw)
                .map_err(|_| CryptoError::key_load(format!("{}: PEM is not UTF-8", path.display())))?;
            Self::from_pkcs8_pem(text)
        } else {
            Self::from_pkcs8_der(&raw)
        };
        key.map_err(|e| CryptoError::key_load(format!("{}: {e}", path.display())))
    }

    /// Returns the key's algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        match self.inner {
            SigningInner::Ecdsa(_) => SignatureAlgorithm::Ecdsa,
            SigningInner::RsaPss(_) => SignatureAlgorithm::RsaPss,
            SigningInner::Ed25519(_) => SignatureAlgorithm::Ed25519,
        }
    }

    /// Derives the matching public key.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the public key cannot be DER-encoded.
    pub fn public_key(&self) -> Result<PublicKey> {
        let inner = match &self.inner {
            SigningInner::Ecdsa(k) => VerifyingInner::Ecdsa(k256::ecdsa::VerifyingKey::from(k)),
            SigningInner::RsaPss(k) => VerifyingInner::RsaPss(k.to_public_key()),
            SigningInner::Ed25519(k) => VerifyingInner::Ed25519(k.verifying_key()),
        };
        PublicKey::from_inner(inner)
            .map_err(|e| CryptoError::key_generation(format!("public key encoding: {e}")))
    }

    /// Signs `message`, hashing it with SHA-256.
    ///
    /// # Errors
    /// Returns `SignatureCreation` if the primitive fails.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>> {
        match &self.inner {
            SigningInner::Ecdsa(k) => {
                let sig: k256::ecdsa::Signature = k
                    .try_sign(message)
                    .map_err(|e| CryptoError::signature_creation(format!("ECDSA: {e}")))?;
                Ok(sig.to_bytes().to_vec())
            }
            SigningInner::RsaPss(k) => {
                let signer = rsa::pss::BlindedSigningKey::<Sha256>::new(k.clone());
                let sig = signer
                    .try_sign_with_rng(&mut OsRng, message)
                    .map_err(|e| CryptoError::signature_creation(format!("RSA-PSS: {e}")))?;
                Ok(sig.to_vec())
            }
            SigningInner::Ed25519(k) => Ok(k.sign(message).to_bytes().to_vec()),
        }
    }

    /// Exports the key as PKCS#8 PEM for the embedding harness to persist.
    ///
    /// # Security Warning
    /// The returned string is zeroized on drop; do not copy it around.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if encoding fails.
    pub fn export_private_key_pem(&self) -> Result<Zeroizing<String>> {
        let pem = match &self.inner {
            SigningInner::Ecdsa(k) => k.to_pkcs8_pem(LineEnding::LF),
            SigningInner::RsaPss(k) => k.to_pkcs8_pem(LineEnding::LF),
            SigningInner::Ed25519(k) => k.to_pkcs8_pem(LineEnding::LF),
        };
        pem.map_err(|e| CryptoError::key_generation(format!("PKCS#8 export: {e}")))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print private key material
        f.debug_struct("PrivateKey")
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

// ============================================
// PublicKey
// ============================================

#[derive(Clone)]
enum VerifyingInner {
    Ecdsa(k256::ecdsa::VerifyingKey),
    RsaPss(rsa::RsaPublicKey),
    Ed25519(ed25519_dalek::VerifyingKey),
}

/// A verification key together with its SPKI DER encoding.
///
/// Equality compares encodings, so two keys are equal exactly when they
/// serialize identically.
#[derive(Clone)]
pub struct PublicKey {
    inner: VerifyingInner,
    der: Vec<u8>,
}

impl PublicKey {
    fn from_inner(inner: VerifyingInner) -> Result<Self> {
        let doc = match &inner {
            VerifyingInner::Ecdsa(k) => k.to_public_key_der(),
            VerifyingInner::RsaPss(k) => k.to_public_key_der(),
            VerifyingInner::Ed25519(k) => k.to_public_key_der(),
        }
        .map_err(|e| CryptoError::malformed(format!("SPKI encoding: {e}")))?;
        Ok(Self {
            inner,
            der: doc.as_bytes().to_vec(),
        })
    }

    /// Parses a SubjectPublicKeyInfo DER key of any supported algorithm.
    ///
    /// # Errors
    /// Returns `KeyLoad` if no supported algorithm accepts the encoding.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = if let Ok(k) = ed25519_dalek::VerifyingKey::from_public_key_der(der) {
            VerifyingInner::Ed25519(k)
        } else if let Ok(k) = k256::ecdsa::VerifyingKey::from_public_key_der(der) {
            VerifyingInner::Ecdsa(k)
        } else if let Ok(k) = rsa::RsaPublicKey::from_public_key_der(der) {
            check_rsa_size(k.size())?;
            VerifyingInner::RsaPss(k)
        } else {
            return Err(CryptoError::key_load("unrecognised SubjectPublicKeyInfo"));
        };
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    /// Parses a PEM-wrapped SubjectPublicKeyInfo.
    ///
    /// # Errors
    /// Returns `KeyLoad` if the PEM is malformed or unsupported.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let (label, doc) = pkcs8::Document::from_pem(pem)
            .map_err(|e| CryptoError::key_load(format!("invalid PEM: {e}")))?;
        if label != "PUBLIC KEY" {
            return Err(CryptoError::key_load(format!("unexpected PEM label '{label}'")));
        }
        Self::from_der(doc.as_bytes())
    }

    /// Loads an SPKI public key (PEM or DER) from a file.
    ///
    /// # Errors
    /// Returns `KeyLoad` if the file is unreadable or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)
            .map_err(|e| CryptoError::key_load(format!("{}: {e}", path.display())))?;
        let key = if looks_like_pem(&raw) {
            let text = std::str::from_utf8(&raw)
                .map_err(|_| CryptoError::key_load(format!("{}: PEM is not UTF-8", path.display())))?;
            Self::from_pem(text)
        } else {
            Self::from_der(&raw)
        };
        key.map_err(|e| CryptoError::key_load(format!("{}: {e}", path.display())))
    }

    /// Returns the key's algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        match self.inner {
            VerifyingInner::Ecdsa(_) => SignatureAlgorithm::Ecdsa,
            VerifyingInner::RsaPss(_) => SignatureAlgorithm::RsaPss,
            VerifyingInner::Ed25519(_) => SignatureAlgorithm::Ed25519,
        }
    }

    /// SubjectPublicKeyInfo DER encoding.
    #[must_use]
    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Verifies `signature` over `message`.
    ///
    /// Malformed signatures verify as `false`; this never panics or errors.
    #[must_use]
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        match &self.inner {
            VerifyingInner::Ecdsa(k) => k256::ecdsa::Signature::from_slice(signature)
                .map(|sig| k.verify(message, &sig).is_ok())
                .unwrap_or(false),
            VerifyingInner::RsaPss(k) => {
                let verifier = rsa::pss::VerifyingKey::<Sha256>::new(k.clone());
                rsa::pss::Signature::try_from(signature)
                    .map(|sig| verifier.verify(message, &sig).is_ok())
                    .unwrap_or(false)
            }
            VerifyingInner::Ed25519(k) => ed25519_dalek::Signature::from_slice(signature)
                .map(|sig| k.verify(message, &sig).is_ok())
                .unwrap_or(false),
        }
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Truncated fingerprint is enough to tell keys apart in logs
        let fp = crate::hash::sha256(&self.der);
        write!(f, "PublicKey({}, {}...)", self.algorithm(), hex::encode(&fp[..4]))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", BASE64.encode(&self.der))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&BASE64.encode(&self.der))
        } else {
            serializer.serialize_bytes(&self.der)
        }
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            BASE64.decode(&s).map_err(serde::de::Error::custom)?
        } else {
            <Vec<u8>>::deserialize(deserializer)?
        };
        Self::from_der(&bytes).map_err(serde::de::Error::custom)
    }
}

// ============================================
// Helpers
// ============================================

fn check_rsa_size(modulus_bytes: usize) -> Result<()> {
    let bits = modulus_bytes * 8;
    if bits < MIN_RSA_MODULUS_BITS {
        return Err(CryptoError::key_load(format!(
            "RSA modulus of {bits} bits is below the {MIN_RSA_MODULUS_BITS}-bit minimum"
        )));
    }
    Ok(())
}

fn looks_like_pem(raw: &[u8]) -> bool {
    raw.iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| raw[start..].starts_with(b"-----BEGIN"))
}

pub(crate) fn read_secret_file(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    std::fs::read(path)
        .map(Zeroizing::new)
        .map_err(|e| CryptoError::key_load(format!("{}: {e}", path.display())))
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_ecdsa_sign_verify() {
        let key = PrivateKey::generate(SignatureAlgorithm::Ecdsa, 0).unwrap();
        let public = key.public_key().unwrap();
        let sig = key.sign(b"payload").unwrap();

        assert_eq!(sig.len(), 64);
        assert!(public.verify(b"payload", &sig));
        assert!(!public.verify(b"payloaD", &sig));
    }

    #[test]
    fn test_ed25519_sign_verify() {
        let key = PrivateKey::generate(SignatureAlgorithm::Ed25519, 0).unwrap();
        let public = key.public_key().unwrap();
        let sig = key.sign(b"payload").unwrap();

        assert!(public.verify(b"payload", &sig));
        assert_eq!(public.algorithm(), SignatureAlgorithm::Ed25519);
    }

    #[test]
    fn test_rsa_pss_sign_verify() {
        let key = PrivateKey::generate(SignatureAlgorithm::RsaPss, 2048).unwrap();
        let public = key.public_key().unwrap();
        let sig = key.sign(b"payload").unwrap();

        assert_eq!(sig.len(), 256);
        assert!(public.verify(b"payload", &sig));
        assert!(!public.verify(b"other", &sig));
    }

    #[test]
    fn test_rsa_minimum_modulus() {
        let err = PrivateKey::generate(SignatureAlgorithm::RsaPss, 1024).unwrap_err();
        assert!(matches!(err, CryptoError::KeyGeneration { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_verify_garbage_is_false() {
        let key = PrivateKey::generate(SignatureAlgorithm::Ecdsa, 0).unwrap();
        let public = key.public_key().unwrap();
        assert!(!public.verify(b"m", &[]));
        assert!(!public.verify(b"m", &[0xFF; 7]));
        assert!(!public.verify(b"m", &[0u8; 64]));
    }

    #[test]
    fn test_cross_key_rejects() {
        let a = PrivateKey::generate(SignatureAlgorithm::Ecdsa, 0).unwrap();
        let b = PrivateKey::generate(SignatureAlgorithm::Ecdsa, 0).unwrap();
        let sig = a.sign(b"m").unwrap();
        assert!(!b.public_key().unwrap().verify(b"m", &sig));
    }

    #[test]
    fn test_public_key_der_roundtrip() {
        for alg in [SignatureAlgorithm::Ecdsa, SignatureAlgorithm::Ed25519] {
            let public = PrivateKey::generate(alg, 0).unwrap().public_key().unwrap();
            let restored = PublicKey::from_der(public.as_der()).unwrap();
            assert_eq!(public, restored);
            assert_eq!(restored.algorithm(), alg);
        }
    }

    #[test]
    fn test_private_key_pem_file_load() {
        let key = PrivateKey::generate(SignatureAlgorithm::Ecdsa, 0).unwrap();
        let pem = key.export_private_key_pem().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();

        let loaded = PrivateKey::load(file.path()).unwrap();
        assert_eq!(loaded.algorithm(), SignatureAlgorithm::Ecdsa);
        assert_eq!(loaded.public_key().unwrap(), key.public_key().unwrap());
    }

    #[test]
    fn test_public_key_der_file_load() {
        let public = PrivateKey::generate(SignatureAlgorithm::Ed25519, 0)
            .unwrap()
            .public_key()
            .unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(public.as_der()).unwrap();

        assert_eq!(PublicKey::load(file.path()).unwrap(), public);
    }

    #[test]
    fn test_load_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not a key").unwrap();

        assert!(matches!(
            PrivateKey::load(file.path()),
            Err(CryptoError::KeyLoad { .. })
        ));
        assert!(matches!(
            PublicKey::load("/nonexistent/vanet.pub"),
            Err(CryptoError::KeyLoad { .. })
        ));
    }

    #[test]
    fn test_debug_redacts() {
        let key = PrivateKey::generate(SignatureAlgorithm::Ed25519, 0).unwrap();
        let dbg = format!("{key:?}");
        assert!(dbg.contains("Ed25519"));
        assert!(!dbg.contains("signing"));
    }

    #[test]
    fn test_public_key_serde() {
        let public = PrivateKey::generate(SignatureAlgorithm::Ecdsa, 0)
            .unwrap()
            .public_key()
            .unwrap();
        let json = serde_json::to_string(&public).unwrap();
        let restored: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(public, restored);
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("rsa-pss".parse::<SignatureAlgorithm>().unwrap(), SignatureAlgorithm::RsaPss);
        assert_eq!(SignatureAlgorithm::default(), SignatureAlgorithm::Ecdsa);
        assert!("dsa".parse::<SignatureAlgorithm>().is_err());
    }
}
