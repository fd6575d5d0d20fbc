// ============================================
// File: crates/vanet-routing/src/services/sequence.rs
// ============================================
//! # Sequence Tracker
//!
//! ## Creation Reason
//! The replay cache only remembers exact envelopes. Tracking the highest
//! accepted sequence number per sender additionally rejects older
//! envelopes that were never seen here, as long as the sender was heard
//! from recently.
//!
//! ## ⚠️ Important Note for Next Developer
//! - A tracker older than the window no longer constrains its sender,
//!   so a restarted peer whose counter began again at 1 is accepted
//! - Record only after the envelope authenticated
//!
//! ## Last Modified
//! v0.1.0 - Initial sequence tracker

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use vanet_common::time::Timestamp;
use vanet_common::types::VehicleId;

use crate::model::MessageTracker;

/// Highest accepted sequence number per sender.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    trackers: HashMap<VehicleId, MessageTracker>,
    window: Duration,
}

impl SequenceTracker {
    /// Creates a tracker whose entries constrain senders for `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            trackers: HashMap::new(),
            window,
        }
    }

    /// Returns `false` if `sequence` does not advance a live tracker.
    #[must_use]
    pub fn is_fresh(&self, sender: &VehicleId, sequence: u32, now: Timestamp) -> bool {
        match self.trackers.get(sender) {
            Some(tracker) if self.is_live(tracker, now) => sequence > tracker.last_sequence,
            _ => true,
        }
    }

    /// Records an accepted sequence number.
    pub fn record(&mut self, sender: &VehicleId, sequence: u32, now: Timestamp) {
        trace!(sender = %sender, seq = sequence, "Sequence recorded");
        self.trackers.insert(
            sender.clone(),
            MessageTracker {
                last_sequence: sequence,
                last_update: now,
            },
        );
    }

    #[must_use]
    pub fn get(&self, sender: &VehicleId) -> Option<&MessageTracker> {
        self.trackers.get(sender)
    }

    /// Forgets trackers that no longer constrain their sender.
    pub fn prune(&mut self, now: Timestamp) -> usize {
        let before = self.trackers.len();
        let window = self.window;
        self.trackers
            .retain(|_, tracker| tracker.last_update.saturating_add(window) > now);
        before - self.trackers.len()
    }

    fn is_live(&self, tracker: &MessageTracker, now: Timestamp) -> bool {
        now.duration_since(tracker.last_update) < self.window
    }
}
