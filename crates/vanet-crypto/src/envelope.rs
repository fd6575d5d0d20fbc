// ============================================
// File: crates/vanet-crypto/src/envelope.rs
// ============================================
//! # Secure Message Envelope
//!
//! ## Creation Reason
//! Every routing frame travels inside a signed, timestamped,
//! sequence-numbered envelope. This module defines that envelope and its
//! stable wire encoding.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ u32 LE len ‖ payload                        │
//! │ u32 LE len ‖ signature                      │
//! │ u64 LE timestamp (ms since epoch)           │
//! │ u32 LE sequence number                      │
//! │ u32 LE len ‖ sender certificate (0 = none)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Signed Bytes
//! ```text
//! payload ‖ timestamp (u64 LE) ‖ sequence (u32 LE)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The signed scope is exactly the three fields above; do not add the
//!   certificate or framing, other implementations depend on it
//! - Decoding rejects trailing bytes
//!
//! ## Last Modified
//! v0.1.0 - Initial envelope codec

use bytes::{BufMut, Bytes, BytesMut};

use vanet_common::time::Timestamp;

use crate::error::{CryptoError, Result};
use crate::wire::{get_field, get_u32, get_u64, put_field, LEN_PREFIX};

// ============================================
// Constants
// ============================================

/// Smallest possible envelope: three empty fields plus timestamp and sequence.
pub const MIN_ENVELOPE_SIZE: usize = LEN_PREFIX * 3 + 8 + 4;

/// Maximum payload size accepted from the wire.
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// Maximum signature size (covers RSA-4096).
pub const MAX_SIGNATURE_LEN: usize = 1024;

/// Maximum embedded certificate size.
pub const MAX_CERTIFICATE_LEN: usize = 16 * 1024;

// ============================================
// SecureMessage
// ============================================

/// A signed, replay-protected protocol envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureMessage {
    /// Protocol payload (a routing frame)
    pub payload: Vec<u8>,
    /// Signature over [`SecureMessage::signed_bytes`]
    pub signature: Vec<u8>,
    /// Creation time
    pub timestamp: Timestamp,
    /// Per-sender monotonic sequence number
    pub sequence_number: u32,
    /// Encoded sender certificate, empty when none is attached
    pub sender_cert: Vec<u8>,
}

impl SecureMessage {
    /// Builds the byte string a sender signs.
    #[must_use]
    pub fn signed_bytes(payload: &[u8], timestamp: Timestamp, sequence_number: u32) -> Vec<u8> {
        let mut data = Vec::with_capacity(payload.len() + 12);
        data.extend_from_slice(payload);
        data.extend_from_slice(&timestamp.to_le_bytes());
        data.extend_from_slice(&sequence_number.to_le_bytes());
        data
    }

    /// The signed bytes of this envelope, rebuilt from its received fields.
    #[must_use]
    pub fn to_signed_bytes(&self) -> Vec<u8> {
        Self::signed_bytes(&self.payload, self.timestamp, self.sequence_number)
    }

    /// Returns `true` if a sender certificate is attached.
    #[must_use]
    pub fn has_certificate(&self) -> bool {
        !self.sender_cert.is_empty()
    }

    /// Size of the wire encoding.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        MIN_ENVELOPE_SIZE + self.payload.len() + self.signature.len() + self.sender_cert.len()
    }

    /// Encodes the envelope.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        put_field(&mut buf, &self.payload);
        put_field(&mut buf, &self.signature);
        buf.put_u64_le(self.timestamp.as_millis());
        buf.put_u32_le(self.sequence_number);
        put_field(&mut buf, &self.sender_cert);
        buf.freeze()
    }

    /// Decodes an envelope.
    ///
    /// # Errors
    /// - `MessageTooShort` below [`MIN_ENVELOPE_SIZE`]
    /// - `FieldTooLarge` if a length prefix exceeds its bound
    /// - `MalformedMessage` on truncation or trailing bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_ENVELOPE_SIZE {
            return Err(CryptoError::too_short(MIN_ENVELOPE_SIZE, bytes.len()));
        }

        let mut buf = bytes;
        let payload = get_field(&mut buf, MAX_PAYLOAD_LEN, "payload")?;
        let signature = get_field(&mut buf, MAX_SIGNATURE_LEN, "signature")?;
        let timestamp = Timestamp::from_millis(get_u64(&mut buf, "timestamp")?);
        let sequence_number = get_u32(&mut buf, "sequence number")?;
        let sender_cert = get_field(&mut buf, MAX_CERTIFICATE_LEN, "sender certificate")?;

        if !buf.is_empty() {
            return Err(CryptoError::malformed(format!(
                "envelope has {} trailing bytes",
                buf.len()
            )));
        }

        Ok(Self {
            payload,
            signature,
            timestamp,
            sequence_number,
            sender_cert,
        })
    }
}

// ============================================
// Tests
// ============================================
