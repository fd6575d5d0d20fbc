// ============================================
// File: crates/vanet-crypto/src/lib.rs
// ============================================
//! # VANET Crypto - Cryptographic Message Layer
//!
//! ## Creation Reason
//! Every vehicle authenticates and freshness-checks each control and data
//! message it exchanges. This crate owns the key material, certificates
//! and replay cache that make that possible, independent of routing.
//!
//! ## Main Functionality
//! - [`keys`]: Operational keys (ECDSA secp256k1, RSA-PSS, Ed25519)
//! - [`hash`]: Selectable digests (SHA-256 default, weak legacy options)
//! - [`certificate`]: Certificate codec and chain validation
//! - [`envelope`]: `SecureMessage` and its wire format
//! - [`history`]: Time-pruned replay cache
//! - [`layer`]: `CryptoLayer`, the per-vehicle facade
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              vanet-routing                          │
//! │                    │                                │
//! │                    ▼                                │
//! │              vanet-crypto  ◄── You are here         │
//! │                    │                                │
//! │                    ▼                                │
//! │              vanet-common                           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Security Guarantees
//! - **Authenticity**: Every envelope is signed over payload, time and sequence
//! - **Freshness**: Envelopes older than the timeout or future-dated fail
//! - **Replay Protection**: Accepted envelopes are remembered
//! - **Identity Binding**: Certificates chain to configured trust anchors
//!
//! ## ⚠️ Important Note for Next Developer
//! - ALL primitives come from RustCrypto / dalek; never roll your own
//! - Private keys are zeroized on drop and never logged
//! - One `CryptoLayer` per vehicle; nothing here is process-global except
//!   the backend self test
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod certificate;
pub mod config;
pub mod envelope;
pub mod error;
pub mod hash;
pub mod history;
pub mod keys;
pub mod layer;
mod wire;

// Re-export commonly used items
pub use certificate::{Certificate, TbsCertificate, TrustStore, MAX_CERT_CHAIN};
pub use config::{CryptoConfig, TrustAnchorConfig};
pub use envelope::SecureMessage;
pub use error::{CryptoError, Result};
pub use hash::{hash_message, sha256, HashAlgorithm};
pub use keys::{PrivateKey, PublicKey, SignatureAlgorithm};
pub use layer::{CryptoLayer, VerificationStats};
