// ============================================
// File: crates/vanet-crypto/src/config.rs
// ============================================
//! # Crypto Layer Configuration
//!
//! ## Creation Reason
//! Groups the knobs of the cryptographic message layer so they can be
//! embedded as the `[crypto]` section of the protocol configuration.
//!
//! ## Example Configuration
//! ```toml
//! [crypto]
//! signature_algorithm = "ecdsa"
//! rsa_modulus_bits = 2048
//! message_timeout_ms = 5000
//! max_message_history = 1000
//! private_key_path = "/etc/vanet/vehicle.key"
//! certificate_path = "/etc/vanet/vehicle.cert"
//!
//! [[crypto.trust_anchors]]
//! issuer = "road-authority"
//! public_key_path = "/etc/vanet/authority.pub"
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::keys::{SignatureAlgorithm, DEFAULT_RSA_MODULUS_BITS, MIN_RSA_MODULUS_BITS};

/// Crypto layer configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CryptoConfig {
    /// Algorithm for a generated operational key.
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,

    /// RSA modulus size when `signature_algorithm = "rsa-pss"`.
    #[serde(default = "default_rsa_modulus_bits")]
    pub rsa_modulus_bits: usize,

    /// Freshness window for inbound envelopes in milliseconds.
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,

    /// Maximum number of remembered envelopes.
    #[serde(default = "default_max_message_history")]
    pub max_message_history: usize,

    /// PKCS#8 private key to load instead of generating one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key_path: Option<PathBuf>,

    /// Encoded certificate for the operational key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_path: Option<PathBuf>,

    /// Issuers whose certificates are accepted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trust_anchors: Vec<TrustAnchorConfig>,
}

/// One trusted certificate issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustAnchorConfig {
    /// Issuer name as it appears in certificates.
    pub issuer: String,
    /// SPKI public key file (PEM or DER).
    pub public_key_path: PathBuf,
}

fn default_rsa_modulus_bits() -> usize {
    DEFAULT_RSA_MODULUS_BITS
}

fn default_message_timeout_ms() -> u64 {
    5_000
}

fn default_max_message_history() -> usize {
    1_000
}

impl CryptoConfig {
    /// Validates the section.
    ///
    /// # Errors
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.rsa_modulus_bits < MIN_RSA_MODULUS_BITS {
            return Err(format!(
                "rsa_modulus_bits must be at least {MIN_RSA_MODULUS_BITS}"
            ));
        }
        if self.message_timeout_ms == 0 {
            return Err("message_timeout_ms must be > 0".to_string());
        }
        if self.max_message_history == 0 {
            return Err("max_message_history must be > 0".to_string());
        }
        if let Some(anchor) = self.trust_anchors.iter().find(|a| a.issuer.is_empty()) {
            return Err(format!(
                "trust anchor at {} has an empty issuer",
                anchor.public_key_path.display()
            ));
        }
        Ok(())
    }

    /// Freshness window as a `Duration`.
    #[must_use]
    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            signature_algorithm: SignatureAlgorithm::default(),
            rsa_modulus_bits: default_rsa_modulus_bits(),
            message_timeout_ms: default_message_timeout_ms(),
            max_message_history: default_max_message_history(),
            private_key_path: None,
            certificate_path: None,
            trust_anchors: Vec::new(),
        }
    }
}
