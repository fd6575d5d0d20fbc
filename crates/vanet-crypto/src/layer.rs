// ============================================
// File: crates/vanet-crypto/src/layer.rs
// ============================================
//! # Cryptographic Message Layer
//!
//! ## Creation Reason
//! One vehicle's view of cryptography: its operational key, its
//! certificate, the authorities it trusts, a per-instance sequence
//! counter and the replay cache. The routing engine seals every outbound
//! frame and opens every inbound frame through this type.
//!
//! ## Main Functionality
//! - `CryptoLayer`: Key store, envelope sealing and verification
//! - `VerificationStats`: Per-reason rejection counters
//!
//! ## Verification Order
//! ```text
//! envelope ──► fresh? ──► not replayed? ──► certificate valid? ──► signature?
//!                │              │                   │                  │
//!              stale        replayed         bad_certificate     bad_signature
//! ```
//! Any failed step answers `false`. The caller never learns which step
//! failed; the reason is logged at debug level and counted.
//!
//! ## ⚠️ Important Note for Next Developer
//! - The sequence counter belongs to this instance; never share it
//! - `verify_secure_message` does NOT record the envelope. The caller
//!   records it with `update_message_history` once it accepts it
//! - All state is owned here and released on drop, error paths included
//!
//! ## Last Modified
//! v0.1.0 - Initial message layer

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, trace, warn};
use zeroize::Zeroizing;

use vanet_common::time::{Clock, Timestamp};

use crate::backend::ensure_initialized;
use crate::certificate::{Certificate, TrustStore};
use crate::config::CryptoConfig;
use crate::envelope::SecureMessage;
use crate::error::{CryptoError, Result};
use crate::hash::{hash_message, HashAlgorithm};
use crate::history::{HistoryEntry, MessageHistory};
use crate::keys::{PrivateKey, PublicKey, SignatureAlgorithm};

// ============================================
// VerificationStats
// ============================================

/// Counters for inbound envelope verification outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VerificationStats {
    /// Envelopes that passed every check
    pub verified: u64,
    /// Outside the freshness window
    pub stale: u64,
    /// Already seen
    pub replayed: u64,
    /// Certificate unparseable or rejected by the trust store
    pub bad_certificate: u64,
    /// Signature did not verify, or no key was available
    pub bad_signature: u64,
    /// Bytes could not be decoded as an envelope
    pub malformed: u64,
}

impl VerificationStats {
    /// Total envelopes rejected for any reason.
    #[must_use]
    pub const fn rejected(&self) -> u64 {
        self.stale + self.replayed + self.bad_certificate + self.bad_signature + self.malformed
    }
}

// ============================================
// CryptoLayer
// ============================================

/// Per-vehicle cryptographic message layer.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use vanet_common::time::{ManualClock, Timestamp};
/// use vanet_crypto::{CryptoConfig, CryptoLayer, SignatureAlgorithm};
///
/// let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_000_000)));
/// let mut layer = CryptoLayer::new(CryptoConfig::default(), clock).unwrap();
/// layer.generate_key_pair(SignatureAlgorithm::Ecdsa).unwrap();
///
/// let msg = layer.create_secure_message(b"hello").unwrap();
/// assert!(layer.verify_secure_message(&msg));
/// ```
pub struct CryptoLayer {
    config: CryptoConfig,
    clock: Arc<dyn Clock>,
    private_key: Option<PrivateKey>,
    public_key: Option<PublicKey>,
    /// Loaded peer key for envelopes without a certificate
    verification_key: Option<PublicKey>,
    certificate: Option<Certificate>,
    /// Cached encoding attached to outbound envelopes
    certificate_bytes: Vec<u8>,
    trust_store: TrustStore,
    history: MessageHistory,
    /// Last issued sequence number (0 = none yet)
    last_sequence: u32,
    exhausted: bool,
    stats: VerificationStats,
}

impl CryptoLayer {
    /// Creates a layer with no key material.
    ///
    /// # Errors
    /// Returns `BackendInit` if the process-wide self test fails.
    pub fn new(config: CryptoConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        ensure_initialized()?;
        let history = MessageHistory::new(config.max_message_history, config.message_timeout());
        Ok(Self {
            config,
            clock,
            private_key: None,
            public_key: None,
            verification_key: None,
            certificate: None,
            certificate_bytes: Vec::new(),
            trust_store: TrustStore::new(),
            history,
            last_sequence: 0,
            exhausted: false,
            stats: VerificationStats::default(),
        })
    }

    /// Creates a layer and loads the trust anchors named in `config`.
    ///
    /// # Errors
    /// Returns `KeyLoad` if an anchor key cannot be read.
    pub fn from_config(config: CryptoConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let anchors = config.trust_anchors.clone();
        let mut layer = Self::new(config, clock)?;
        for anchor in anchors {
            let key = PublicKey::load(&anchor.public_key_path)?;
            layer.add_trust_anchor(anchor.issuer, key);
        }
        Ok(layer)
    }

    /// Installs the operational key: loaded from `private_key_path` when
    /// configured, otherwise freshly generated. Loads the configured
    /// certificate, if any.
    ///
    /// # Errors
    /// - `KeyLoad` if a configured file is unreadable or malformed
    /// - `KeyGeneration` if generation fails
    pub fn initialize_keys(&mut self) -> Result<()> {
        match self.config.private_key_path.clone() {
            Some(path) => self.load_private_key(path)?,
            None => self.generate_key_pair(self.config.signature_algorithm)?,
        }
        if let Some(path) = self.config.certificate_path.clone() {
            self.load_certificate(path)?;
        }
        Ok(())
    }

    // ========================================
    // Key Management
    // ========================================

    /// Generates and installs a fresh operational key pair.
    ///
    /// # Errors
    /// Returns `KeyGeneration` if the primitive rejects the parameters.
    pub fn generate_key_pair(&mut self, algorithm: SignatureAlgorithm) -> Result<()> {
        let key = PrivateKey::generate(algorithm, self.config.rsa_modulus_bits)?;
        let public = key.public_key()?;
        info!(algorithm = %algorithm, key = ?public, "Operational key pair generated");
        self.private_key = Some(key);
        self.public_key = Some(public);
        Ok(())
    }

    /// Loads the operational private key from a PKCS#8 file.
    ///
    /// # Errors
    /// Returns `KeyLoad` on unreadable or malformed input.
    pub fn load_private_key(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let key = PrivateKey::load(path.as_ref())?;
        let public = key.public_key()?;
        info!(path = %path.as_ref().display(), algorithm = %key.algorithm(), "Private key loaded");
        self.private_key = Some(key);
        self.public_key = Some(public);
        Ok(())
    }

    /// Loads the public key used to verify envelopes that carry no
    /// certificate. The operational key pair is left untouched.
    ///
    /// # Errors
    /// Returns `KeyLoad` on unreadable or malformed input.
    pub fn load_public_key(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let key = PublicKey::load(path.as_ref())?;
        debug!(path = %path.as_ref().display(), key = ?key, "Verification key loaded");
        self.verification_key = Some(key);
        Ok(())
    }

    /// Loads this vehicle's certificate from a file.
    ///
    /// # Errors
    /// Returns `KeyLoad` on unreadable or malformed input.
    pub fn load_certificate(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let cert = Certificate::load(path.as_ref())?;
        info!(path = %path.as_ref().display(), subject = %cert.subject(), "Certificate loaded");
        self.set_certificate(cert);
        Ok(())
    }

    /// Installs this vehicle's certificate.
    pub fn set_certificate(&mut self, cert: Certificate) {
        if let Some(public) = &self.public_key {
            if public != cert.public_key() {
                warn!(subject = %cert.subject(), "Certificate key does not match the operational key");
            }
        }
        self.certificate_bytes = cert.to_bytes();
        self.certificate = Some(cert);
    }

    /// Trusts `key` as the signing key of `issuer`.
    pub fn add_trust_anchor(&mut self, issuer: impl Into<String>, key: PublicKey) {
        self.trust_store.add_anchor(issuer, key);
    }

    /// Registers an intermediate authority certificate.
    pub fn add_intermediate_certificate(&mut self, cert: Certificate) {
        self.trust_store.add_intermediate(cert);
    }

    /// Exports the operational private key as PKCS#8 PEM.
    ///
    /// # Errors
    /// Returns `NoKey` if no private key is installed.
    pub fn export_private_key_pem(&self) -> Result<Zeroizing<String>> {
        self.private_key
            .as_ref()
            .ok_or(CryptoError::NoKey)?
            .export_private_key_pem()
    }

    // ========================================
    // Primitives
    // ========================================

    /// Hashes `data` with the chosen algorithm.
    #[must_use]
    pub fn hash_message(&self, data: &[u8], algorithm: HashAlgorithm) -> Vec<u8> {
        hash_message(data, algorithm)
    }

    /// Signs `data` with the operational key.
    ///
    /// # Errors
    /// - `NoKey` if no private key is installed
    /// - `SignatureCreation` if the primitive fails
    pub fn sign_message(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.private_key.as_ref().ok_or(CryptoError::NoKey)?.sign(data)
    }

    /// Verifies `signature` over `message` with `public_key`.
    #[must_use]
    pub fn verify_signature(&self, message: &[u8], signature: &[u8], public_key: &PublicKey) -> bool {
        public_key.verify(message, signature)
    }

    // ========================================
    // Envelopes
    // ========================================

    /// Seals `payload` in a signed envelope stamped with the current time
    /// and the next sequence number.
    ///
    /// # Errors
    /// - `NoKey` if no private key is installed
    /// - `SequenceExhausted` once `u32::MAX` has been issued
    pub fn create_secure_message(&mut self, payload: &[u8]) -> Result<SecureMessage> {
        let key = self.private_key.as_ref().ok_or(CryptoError::NoKey)?;
        if self.exhausted {
            return Err(CryptoError::SequenceExhausted);
        }
        let sequence_number = self.last_sequence + 1;
        let timestamp = self.clock.now();

        let signature = key.sign(&SecureMessage::signed_bytes(payload, timestamp, sequence_number))?;

        // Commit the counter only after signing succeeded
        self.last_sequence = sequence_number;
        self.exhausted = sequence_number == u32::MAX;

        trace!(seq = sequence_number, timestamp = %timestamp, len = payload.len(), "Envelope sealed");

        Ok(SecureMessage {
            payload: payload.to_vec(),
            signature,
            timestamp,
            sequence_number,
            sender_cert: self.certificate_bytes.clone(),
        })
    }

    /// Decodes envelope bytes, counting failures as malformed.
    ///
    /// # Errors
    /// Returns the decoding error.
    pub fn open_envelope(&mut self, bytes: &[u8]) -> Result<SecureMessage> {
        SecureMessage::decode(bytes).map_err(|e| {
            self.stats.malformed += 1;
            debug!(error = %e, "Envelope rejected: malformed");
            e
        })
    }

    /// Verifies an envelope, using the attached certificate's key or, when
    /// none is attached, the loaded verification key (else our own).
    #[must_use]
    pub fn verify_secure_message(&mut self, message: &SecureMessage) -> bool {
        let fallback = self.verification_key().cloned();
        self.verify_with_fallback(message, fallback.as_ref())
    }

    /// Verifies an envelope, using the attached certificate's key or, when
    /// none is attached, `public_key`.
    #[must_use]
    pub fn verify_secure_message_with_key(&mut self, message: &SecureMessage, public_key: &PublicKey) -> bool {
        self.verify_with_fallback(message, Some(public_key))
    }

    fn verify_with_fallback(&mut self, message: &SecureMessage, fallback: Option<&PublicKey>) -> bool {
        let now = self.clock.now();

        // (a) freshness
        let oldest = now.saturating_sub(self.config.message_timeout());
        if message.timestamp < oldest || message.timestamp > now {
            self.stats.stale += 1;
            debug!(timestamp = %message.timestamp, now = %now, "Envelope rejected: stale or future-dated");
            return false;
        }

        // (b) replay
        if self.is_replay_message(message) {
            self.stats.replayed += 1;
            warn!(seq = message.sequence_number, timestamp = %message.timestamp, "Envelope rejected: replay");
            return false;
        }

        // (c) certificate
        let cert_key;
        let key = if message.has_certificate() {
            match self.validate_certificate_bytes(&message.sender_cert, now) {
                Ok(cert) => {
                    cert_key = cert.public_key().clone();
                    &cert_key
                }
                Err(e) => {
                    self.stats.bad_certificate += 1;
                    debug!(error = %e, "Envelope rejected: certificate");
                    return false;
                }
            }
        } else if let Some(key) = fallback {
            key
        } else {
            self.stats.bad_signature += 1;
            debug!("Envelope rejected: no verification key");
            return false;
        };

        // (d) signature
        if !key.verify(&message.to_signed_bytes(), &message.signature) {
            self.stats.bad_signature += 1;
            debug!(seq = message.sequence_number, "Envelope rejected: bad signature");
            return false;
        }

        self.stats.verified += 1;
        true
    }

    fn validate_certificate_bytes(&self, bytes: &[u8], now: Timestamp) -> Result<Certificate> {
        let cert = Certificate::from_bytes(bytes)?;
        self.trust_store.validate(&cert, now)?;
        Ok(cert)
    }

    /// Returns `true` if an identical envelope was already accepted.
    ///
    /// Identity is timestamp, sequence number and payload hash, so two
    /// senders that happen to share a (timestamp, sequence) pair are not
    /// mistaken for each other.
    #[must_use]
    pub fn is_replay_message(&self, message: &SecureMessage) -> bool {
        self.history.contains(&HistoryEntry::new(
            message.timestamp,
            message.sequence_number,
            &message.payload,
        ))
    }

    /// Records an accepted envelope in the replay cache.
    pub fn update_message_history(&mut self, message: &SecureMessage) {
        let entry = HistoryEntry::new(message.timestamp, message.sequence_number, &message.payload);
        self.history.record(entry, self.clock.now());
    }

    // ========================================
    // Certificates
    // ========================================

    /// Validates a certificate and its chain against the trust store.
    #[must_use]
    pub fn verify_certificate(&self, cert: &Certificate) -> bool {
        match self.trust_store.validate(cert, self.clock.now()) {
            Ok(()) => true,
            Err(e) => {
                debug!(subject = %cert.subject(), error = %e, "Certificate rejected");
                false
            }
        }
    }

    /// Returns `true` if `cert` is outside its validity window now.
    #[must_use]
    pub fn is_certificate_expired(&self, cert: &Certificate) -> bool {
        cert.is_expired(self.clock.now())
    }

    // ========================================
    // Accessors
    // ========================================

    /// The operational public key, if installed.
    #[must_use]
    pub fn public_key(&self) -> Option<&PublicKey> {
        self.public_key.as_ref()
    }

    /// Key used for envelopes without a certificate: the loaded
    /// verification key if any, else the operational public key.
    #[must_use]
    pub fn verification_key(&self) -> Option<&PublicKey> {
        self.verification_key.as_ref().or(self.public_key.as_ref())
    }

    /// Returns `true` if a private key is installed.
    #[must_use]
    pub fn has_private_key(&self) -> bool {
        self.private_key.is_some()
    }

    /// This vehicle's certificate, if installed.
    #[must_use]
    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Encoded certificate attached to outbound envelopes (empty if none).
    #[must_use]
    pub fn certificate_bytes(&self) -> &[u8] {
        &self.certificate_bytes
    }

    /// Last sequence number issued (0 before the first envelope).
    #[must_use]
    pub fn last_sequence(&self) -> u32 {
        self.last_sequence
    }

    /// Verification counters.
    #[must_use]
    pub fn stats(&self) -> VerificationStats {
        self.stats
    }

    /// Number of envelopes in the replay cache.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &CryptoConfig {
        &self.config
    }

    /// Current time from the layer's clock.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    #[cfg(test)]
    fn set_last_sequence(&mut self, seq: u32) {
        self.last_sequence = seq;
    }
}

impl std::fmt::Debug for CryptoLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoLayer")
            .field("public_key", &self.public_key)
            .field("has_certificate", &self.certificate.is_some())
            .field("last_sequence", &self.last_sequence)
            .field("history_len", &self.history.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================
