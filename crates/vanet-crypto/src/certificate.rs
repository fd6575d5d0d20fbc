// ============================================
// File: crates/vanet-crypto/src/certificate.rs
// ============================================
//! # Vehicle Certificates
//!
//! ## Creation Reason
//! Peers prove the binding between their identity and their operational
//! key with certificates issued by an external authority. This module
//! parses them and validates issuer chains; it never issues anything.
//!
//! ## Main Functionality
//! - `TbsCertificate`: The signed portion of a certificate
//! - `Certificate`: TBS fields plus the issuer's signature
//! - `TrustStore`: Trust anchors, intermediates and chain validation
//!
//! ## Wire Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ u32 len ‖ subject (UTF-8)                    │ ┐
//! │ u32 len ‖ issuer  (UTF-8)                    │ │
//! │ u32 len ‖ public key (SPKI DER)              │ │ to-be-signed
//! │ u64 valid_from  (ms since epoch)             │ │
//! │ u64 valid_until (ms since epoch)             │ ┘
//! │ u32 len ‖ issuer signature                   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Chain Validation
//! ```text
//!   leaf ──issuer──► intermediate ──issuer──► ... ──issuer──► anchor key
//!   (each link: validity window + signature, at most MAX_CERT_CHAIN certs)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Validation fails closed: unknown issuer, bad signature, expiry or
//!   excessive depth all reject
//! - Intermediates are looked up by subject name
//!
//! ## Last Modified
//! v0.1.0 - Initial certificate support

use std::collections::HashMap;
use std::path::Path;

use bytes::{BufMut, BytesMut};
use tracing::debug;

use vanet_common::time::Timestamp;

use crate::error::{CryptoError, Result};
use crate::keys::{read_secret_file, PublicKey};
use crate::wire::{get_field, get_string, get_u64, put_field};

// ============================================
// Constants
// ============================================

/// Maximum number of certificates in a chain, leaf included.
pub const MAX_CERT_CHAIN: usize = 5;

/// Upper bound on any single certificate field.
pub const MAX_CERT_FIELD_LEN: usize = 8 * 1024;

// ============================================
// TbsCertificate
// ============================================

/// The to-be-signed portion of a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TbsCertificate {
    /// Vehicle (or authority) the key belongs to
    pub subject: String,
    /// Authority that signed this certificate
    pub issuer: String,
    /// Subject's public key
    pub public_key: PublicKey,
    /// Start of validity (inclusive)
    pub valid_from: Timestamp,
    /// End of validity (inclusive)
    pub valid_until: Timestamp,
}

impl TbsCertificate {
    /// Encodes the bytes the issuer signs.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.encode_into(&mut buf);
        buf.to_vec()
    }

    fn encode_into(&self, buf: &mut BytesMut) {
        put_field(buf, self.subject.as_bytes());
        put_field(buf, self.issuer.as_bytes());
        put_field(buf, self.public_key.as_der());
        buf.put_u64_le(self.valid_from.as_millis());
        buf.put_u64_le(self.valid_until.as_millis());
    }

    /// Attaches an issuer signature produced over [`Self::encode`].
    #[must_use]
    pub fn into_certificate(self, signature: Vec<u8>) -> Certificate {
        Certificate {
            tbs: self,
            signature,
        }
    }
}

// ============================================
// Certificate
// ============================================

/// An externally issued vehicle certificate.
///
/// # Example
/// ```
/// use vanet_common::time::Timestamp;
/// use vanet_crypto::certificate::{Certificate, TbsCertificate};
/// use vanet_crypto::keys::{PrivateKey, SignatureAlgorithm};
///
/// let ca = PrivateKey::generate(SignatureAlgorithm::Ed25519, 0).unwrap();
/// let vehicle = PrivateKey::generate(SignatureAlgorithm::Ecdsa, 0).unwrap();
///
/// let tbs = TbsCertificate {
///     subject: "car-1".into(),
///     issuer: "road-authority".into(),
///     public_key: vehicle.public_key().unwrap(),
///     valid_from: Timestamp::from_millis(0),
///     valid_until: Timestamp::from_millis(10_000),
/// };
/// let sig = ca.sign(&tbs.encode()).unwrap();
/// let cert = tbs.into_certificate(sig);
///
/// let parsed = Certificate::from_bytes(&cert.to_bytes()).unwrap();
/// assert_eq!(parsed, cert);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    tbs: TbsCertificate,
    signature: Vec<u8>,
}

impl Certificate {
    /// Returns the subject name.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.tbs.subject
    }

    /// Returns the issuer name.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.tbs.issuer
    }

    /// Returns the certified public key.
    #[must_use]
    pub fn public_key(&self) -> &PublicKey {
        &self.tbs.public_key
    }

    /// Returns the start of validity.
    #[must_use]
    pub fn valid_from(&self) -> Timestamp {
        self.tbs.valid_from
    }

    /// Returns the end of validity.
    #[must_use]
    pub fn valid_until(&self) -> Timestamp {
        self.tbs.valid_until
    }

    /// Returns the issuer signature.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The bytes covered by the issuer signature.
    #[must_use]
    pub fn to_be_signed(&self) -> Vec<u8> {
        self.tbs.encode()
    }

    /// Returns `true` unless `valid_from ≤ now ≤ valid_until`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp) -> bool {
        now < self.tbs.valid_from || now > self.tbs.valid_until
    }

    /// Encodes the certificate.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.tbs.encode_into(&mut buf);
        put_field(&mut buf, &self.signature);
        buf.to_vec()
    }

    /// Decodes a certificate.
    ///
    /// # Errors
    /// Returns a malformed-message error on truncation, trailing bytes,
    /// oversized fields or an unparseable public key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut buf = bytes;
        let subject = get_string(&mut buf, MAX_CERT_FIELD_LEN, "certificate subject")?;
        let issuer = get_string(&mut buf, MAX_CERT_FIELD_LEN, "certificate issuer")?;
        let key_der = get_field(&mut buf, MAX_CERT_FIELD_LEN, "certificate public key")?;
        let valid_from = Timestamp::from_millis(get_u64(&mut buf, "certificate valid_from")?);
        let valid_until = Timestamp::from_millis(get_u64(&mut buf, "certificate valid_until")?);
        let signature = get_field(&mut buf, MAX_CERT_FIELD_LEN, "certificate signature")?;

        if !buf.is_empty() {
            return Err(CryptoError::malformed(format!(
                "certificate has {} trailing bytes",
                buf.len()
            )));
        }

        let public_key = PublicKey::from_der(&key_der)
            .map_err(|_| CryptoError::malformed("certificate public key is not valid SPKI"))?;

        Ok(Self {
            tbs: TbsCertificate {
                subject,
                issuer,
                public_key,
                valid_from,
                valid_until,
            },
            signature,
        })
    }

    /// Loads an encoded certificate from a file.
    ///
    /// # Errors
    /// Returns `KeyLoad` if the file is unreadable or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = read_secret_file(path)?;
        Self::from_bytes(&raw).map_err(|e| CryptoError::key_load(format!("{}: {e}", path.display())))
    }
}

// ============================================
// TrustStore
// ============================================

/// Trust anchors and intermediate certificates used for chain validation.
#[derive(Debug, Clone, Default)]
pub struct TrustStore {
    anchors: HashMap<String, PublicKey>,
    intermediates: HashMap<String, Certificate>,
}

impl TrustStore {
    /// Creates an empty store. With no anchors every certificate fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trusts `key` as the signing key of `issuer`.
    pub fn add_anchor(&mut self, issuer: impl Into<String>, key: PublicKey) {
        let issuer = issuer.into();
        debug!(issuer = %issuer, "Trust anchor added");
        self.anchors.insert(issuer, key);
    }

    /// Registers an intermediate authority certificate, keyed by subject.
    pub fn add_intermediate(&mut self, cert: Certificate) {
        debug!(subject = %cert.subject(), issuer = %cert.issuer(), "Intermediate certificate added");
        self.intermediates.insert(cert.subject().to_string(), cert);
    }

    /// Number of configured anchors.
    #[must_use]
    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Validates `cert` and its issuer chain at time `now`.
    ///
    /// # Errors
    /// Returns `Certificate` with the reason for rejection.
    pub fn validate(&self, cert: &Certificate, now: Timestamp) -> Result<()> {
        let mut current = cert;
        let mut depth = 1;

        loop {
            if current.is_expired(now) {
                return Err(CryptoError::certificate(format!(
                    "'{}' is outside its validity window",
                    current.subject()
                )));
            }

            let tbs = current.to_be_signed();

            if let Some(anchor) = self.anchors.get(current.issuer()) {
                return if anchor.verify(&tbs, current.signature()) {
                    Ok(())
                } else {
                    Err(CryptoError::certificate(format!(
                        "bad anchor signature on '{}'",
                        current.subject()
                    )))
                };
            }

            let Some(parent) = self.intermediates.get(current.issuer()) else {
                return Err(CryptoError::certificate(format!(
                    "unknown issuer '{}'",
                    current.issuer()
                )));
            };

            if !parent.public_key().verify(&tbs, current.signature()) {
                return Err(CryptoError::certificate(format!(
                    "bad signature on '{}' from '{}'",
                    current.subject(),
                    parent.subject()
                )));
            }

            depth += 1;
            if depth > MAX_CERT_CHAIN {
                return Err(CryptoError::certificate(format!(
                    "chain exceeds {MAX_CERT_CHAIN} certificates"
                )));
            }
            current = parent;
        }
    }
}

// ============================================
// Tests
// ============================================
