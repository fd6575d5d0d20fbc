// ============================================
// File: crates/vanet-crypto/src/hash.rs
// ============================================
//! # Message Hashing
//!
//! ## Creation Reason
//! Digests are used for replay-cache identity, the forwarding watchdog
//! and interoperability testing against peers that hash with other
//! algorithms.
//!
//! ## Main Functionality
//! - `HashAlgorithm`: Selectable digest algorithm
//! - `hash_message()`: Deterministic digest of a byte string
//! - `sha256()`: Fixed-size SHA-256 helper
//!
//! ## ⚠️ Important Note for Next Developer
//! - MD5 and SHA-1 are broken for collision resistance. They exist only
//!   so test vectors from legacy peers can be reproduced; never sign
//!   with them
//! - Signing paths always use SHA-256 regardless of this setting
//!
//! ## Last Modified
//! v0.1.0 - Initial hashing support

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::Digest;

use crate::error::CryptoError;

// ============================================
// HashAlgorithm
// ============================================

/// Digest algorithms available to the message layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256 (default).
    #[default]
    #[serde(rename = "sha256")]
    Sha256,
    /// SHA3-256.
    #[serde(rename = "sha3-256")]
    Sha3_256,
    /// BLAKE2b with 512-bit output.
    #[serde(rename = "blake2b-512")]
    Blake2b512,
    /// SHA-1. Weak, legacy interoperability only.
    #[serde(rename = "sha1")]
    Sha1,
    /// MD5. Weak, legacy interoperability only.
    #[serde(rename = "md5")]
    Md5,
}

impl HashAlgorithm {
    /// Computes the digest of `data`.
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
            Self::Sha3_256 => sha3::Sha3_256::digest(data).to_vec(),
            Self::Blake2b512 => blake2::Blake2b512::digest(data).to_vec(),
            Self::Sha1 => sha1::Sha1::digest(data).to_vec(),
            Self::Md5 => md5::Md5::digest(data).to_vec(),
        }
    }

    /// Digest length in bytes.
    #[must_use]
    pub const fn output_len(&self) -> usize {
        match self {
            Self::Sha256 | Self::Sha3_256 => 32,
            Self::Blake2b512 => 64,
            Self::Sha1 => 20,
            Self::Md5 => 16,
        }
    }

    /// Returns `true` for algorithms with known practical collision attacks.
    #[must_use]
    pub const fn is_weak(&self) -> bool {
        matches!(self, Self::Sha1 | Self::Md5)
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha3_256 => "sha3-256",
            Self::Blake2b512 => "blake2b-512",
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha3-256" | "sha3_256" => Ok(Self::Sha3_256),
            "blake2b-512" | "blake2b" => Ok(Self::Blake2b512),
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "md5" => Ok(Self::Md5),
            other => Err(CryptoError::unsupported(format!("hash algorithm '{other}'"))),
        }
    }
}

// ============================================
// Helpers
// ============================================

/// Hashes `data` with the chosen algorithm.
#[must_use]
pub fn hash_message(data: &[u8], algorithm: HashAlgorithm) -> Vec<u8> {
    algorithm.digest(data)
}

/// SHA-256 of `data` as a fixed array.
#[must_use]
pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha2::Sha256::digest(data).into()
}

// ============================================
// Tests
// ============================================
