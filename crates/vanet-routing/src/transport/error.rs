// ============================================
// File: crates/vanet-routing/src/transport/error.rs
// ============================================
//! # Transport Error Types
//!
//! ## Creation Reason
//! The medium is an external collaborator; these are the failures it may
//! report back when the engine hands it a frame.
//!
//! ## ⚠️ Important Note for Next Developer
//! - A full queue is transient; the engine never retries on its own, the
//!   harness decides
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

/// Transport layer error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Send operation failed.
    #[error("Failed to send to {destination}: {reason}")]
    SendFailed {
        /// Destination description
        destination: String,
        /// Why send failed
        reason: String,
    },

    /// Outbound queue is full.
    #[error("Outbound queue full ({capacity} frames)")]
    QueueFull {
        /// Queue capacity
        capacity: usize,
    },

    /// The medium is no longer accepting frames.
    #[error("Transport is shutting down")]
    ShuttingDown,
}

impl TransportError {
    /// Creates a send failure.
    pub fn send_failed(destination: impl ToString, reason: impl Into<String>) -> Self {
        Self::SendFailed {
            destination: destination.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if retrying later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueFull { .. } | Self::SendFailed { .. })
    }
}
