// ============================================
// File: crates/vanet-crypto/src/error.rs
// ============================================
//! # Crypto Error Types
//!
//! ## Creation Reason
//! Defines error types for key management, certificate handling and
//! secure envelope encoding in the cryptographic message layer.
//!
//! ## Main Functionality
//! - `CryptoError`: Primary error enum for the crate
//! - Classification helpers (`is_fatal`, `is_suspicious`)
//!
//! ## Error Categories
//! 1. **Key Errors**: Generation, loading, missing key
//! 2. **Encoding Errors**: Malformed envelopes and certificates
//! 3. **Verification Errors**: Undistinguished authentication failure
//! 4. **Backend Errors**: One-time primitive initialisation
//!
//! ## ⚠️ Important Note for Next Developer
//! - NEVER include key material in error messages
//! - `VerificationFailure` deliberately carries no detail; the reason is
//!   only logged at debug level and counted in `VerificationStats`
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use vanet_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;

// ============================================
// CryptoError
// ============================================

/// Errors raised by the cryptographic message layer.
#[derive(Error, Debug)]
pub enum CryptoError {
    // ========================================
    // Key Errors
    // ========================================

    /// Failed to generate a key pair.
    #[error("Key generation failed: {context}")]
    KeyGeneration {
        /// What went wrong
        context: String,
    },

    /// Failed to load a key or certificate from external storage.
    #[error("Key load failed: {context}")]
    KeyLoad {
        /// What was being loaded and why it failed
        context: String,
    },

    /// An operation needed the private key but none is loaded.
    #[error("No private key loaded")]
    NoKey,

    /// Signature creation failed inside the primitive.
    #[error("Failed to create signature: {reason}")]
    SignatureCreation {
        /// Why signing failed
        reason: String,
    },

    /// Algorithm or parameter is not supported.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// Algorithm description
        algorithm: String,
    },

    // ========================================
    // Encoding Errors
    // ========================================

    /// Envelope or certificate bytes could not be parsed.
    #[error("Malformed message: {reason}")]
    MalformedMessage {
        /// What's wrong with the encoding
        reason: String,
    },

    /// Input is shorter than the fixed part of the encoding.
    #[error("Message too short: expected at least {expected} bytes, got {actual}")]
    MessageTooShort {
        /// Minimum expected length
        expected: usize,
        /// Actual length received
        actual: usize,
    },

    /// A length-prefixed field exceeds the allowed size.
    #[error("Field too large: max {max} bytes, got {actual}")]
    FieldTooLarge {
        /// Maximum allowed size
        max: usize,
        /// Declared size
        actual: usize,
    },

    // ========================================
    // Verification Errors
    // ========================================

    /// Certificate failed validation.
    #[error("Certificate rejected: {reason}")]
    Certificate {
        /// Why the certificate was rejected
        reason: String,
    },

    /// Envelope failed freshness, replay, certificate or signature checks.
    #[error("Message verification failed")]
    VerificationFailure,

    // ========================================
    // State Errors
    // ========================================

    /// The per-instance sequence counter cannot advance further.
    #[error("Sequence number space exhausted")]
    SequenceExhausted,

    /// The process-wide backend self test failed.
    #[error("Cryptographic backend initialisation failed: {reason}")]
    BackendInit {
        /// Why initialisation failed
        reason: String,
    },

    // ========================================
    // Wrapped Errors
    // ========================================

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CryptoError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates a `KeyGeneration` error.
    pub fn key_generation(context: impl Into<String>) -> Self {
        Self::KeyGeneration {
            context: context.into(),
        }
    }

    /// Creates a `KeyLoad` error.
    pub fn key_load(context: impl Into<String>) -> Self {
        Self::KeyLoad {
            context: context.into(),
        }
    }

    /// Creates a `SignatureCreation` error.
    pub fn signature_creation(reason: impl Into<String>) -> Self {
        Self::SignatureCreation {
            reason: reason.into(),
        }
    }

    /// Creates an `UnsupportedAlgorithm` error.
    pub fn unsupported(algorithm: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Creates a `MalformedMessage` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    /// Creates a `MessageTooShort` error.
    #[must_use]
    pub const fn too_short(expected: usize, actual: usize) -> Self {
        Self::MessageTooShort { expected, actual }
    }

    /// Creates a `Certificate` error.
    pub fn certificate(reason: impl Into<String>) -> Self {
        Self::Certificate {
            reason: reason.into(),
        }
    }

    /// Creates a `BackendInit` error.
    pub fn backend_init(reason: impl Into<String>) -> Self {
        Self::BackendInit {
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns `true` if no secure operation is possible after this error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::KeyGeneration { .. } | Self::BackendInit { .. })
    }

    /// Returns `true` if this error was caused by bytes received from a peer.
    #[must_use]
    pub const fn is_encoding_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedMessage { .. } | Self::MessageTooShort { .. } | Self::FieldTooLarge { .. }
        )
    }

    /// Returns `true` if this error might indicate an attack.
    #[must_use]
    pub const fn is_suspicious(&self) -> bool {
        matches!(self, Self::VerificationFailure | Self::Certificate { .. })
    }
}

// ============================================
// Tests
// ============================================
