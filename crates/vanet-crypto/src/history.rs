// ============================================
// File: crates/vanet-crypto/src/history.rs
// ============================================
//! # Replay History
//!
//! ## Creation Reason
//! Remembers recently accepted envelopes so an identical envelope
//! presented again inside the freshness window is recognised as a replay.
//!
//! ## Main Logical Flow
//! 1. Verifier asks `contains()` before authenticating
//! 2. Caller records the envelope with `record()` once it is accepted
//! 3. When the cache grows past its bound, entries older than the
//!    timeout are dropped, then the oldest until the bound holds
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never record before acceptance, or a legitimate retransmission of a
//!   message that failed for another reason would look like a replay
//! - Entries outside the freshness window can be forgotten safely because
//!   such envelopes fail the staleness check first
//!
//! ## Last Modified
//! v0.1.0 - Initial replay cache

use std::collections::VecDeque;
use std::time::Duration;

use tracing::trace;

use vanet_common::time::Timestamp;

use crate::hash::sha256;

// ============================================
// HistoryEntry
// ============================================

/// Identity of an accepted envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HistoryEntry {
    /// Envelope timestamp
    pub timestamp: Timestamp,
    /// Envelope sequence number
    pub sequence_number: u32,
    /// SHA-256 of the payload
    pub payload_hash: [u8; 32],
}

impl HistoryEntry {
    /// Builds the entry for an envelope's fields.
    #[must_use]
    pub fn new(timestamp: Timestamp, sequence_number: u32, payload: &[u8]) -> Self {
        Self {
            timestamp,
            sequence_number,
            payload_hash: sha256(payload),
        }
    }
}

// ============================================
// MessageHistory
// ============================================

/// Bounded, time-pruned record of accepted envelopes.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
    timeout: Duration,
}

impl MessageHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new(max_entries: usize, timeout: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries,
            timeout,
        }
    }

    /// Returns `true` if an identical envelope was already accepted.
    #[must_use]
    pub fn contains(&self, entry: &HistoryEntry) -> bool {
        self.entries.iter().any(|e| e == entry)
    }

    /// Appends an accepted envelope and prunes if over the bound.
    pub fn record(&mut self, entry: HistoryEntry, now: Timestamp) {
        self.entries.push_back(entry);
        if self.entries.len() > self.max_entries {
            self.prune(now);
        }
    }

    /// Drops entries older than the timeout, then the oldest entries until
    /// the size bound holds.
    pub fn prune(&mut self, now: Timestamp) {
        let before = self.entries.len();
        let cutoff = now.saturating_sub(self.timeout);
        self.entries.retain(|e| e.timestamp >= cutoff);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
        trace!(removed = before - self.entries.len(), remaining = self.entries.len(), "Message history pruned");
    }

    /// Number of remembered envelopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is remembered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================
// Tests
// ============================================
