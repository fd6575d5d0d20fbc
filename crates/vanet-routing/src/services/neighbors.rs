// ============================================
// File: crates/vanet-routing/src/services/neighbors.rs
// ============================================
//! # Neighbor Table
//!
//! ## Creation Reason
//! Remembers what every vehicle in radio range last said about itself.
//! The previous report is kept alongside the latest one so the
//! transition between them can be re-checked when trust is computed.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Staleness is judged by when a beacon last arrived on our clock,
//!   never by the timestamp a neighbour puts on its own position
//!
//! ## Last Modified
//! v0.1.0 - Initial neighbor table

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use vanet_common::time::Timestamp;
use vanet_common::types::VehicleId;

use crate::model::{Position, VehicleInfo};

/// What we know about one neighbour.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborEntry {
    /// Latest self-report
    pub info: VehicleInfo,
    /// Position carried by the report before the latest one
    pub previous_position: Option<Position>,
    /// Local time the latest beacon from this neighbour was accepted
    pub last_heard: Timestamp,
}

/// Vehicles currently in radio range.
#[derive(Default)]
pub struct NeighborTable {
    neighbors: HashMap<VehicleId, NeighborEntry>,
}

impl NeighborTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fresh self-report heard at `heard_at`, keeping the prior
    /// position.
    pub fn upsert(&mut self, info: VehicleInfo, heard_at: Timestamp) {
        let id = info.id.clone();
        match self.neighbors.get_mut(&id) {
            Some(entry) => {
                let previous = entry.info.position;
                entry.info = info;
                entry.previous_position = Some(previous);
                entry.last_heard = heard_at;
                debug!(neighbor = %id, "Neighbor updated");
            }
            None => {
                self.neighbors.insert(
                    id.clone(),
                    NeighborEntry {
                        info,
                        previous_position: None,
                        last_heard: heard_at,
                    },
                );
                debug!(neighbor = %id, "Neighbor added");
            }
        }
    }

    /// Marks `id` as heard at `heard_at` without touching its positions.
    /// Returns `false` for an unknown neighbour.
    pub fn touch(&mut self, id: &VehicleId, heard_at: Timestamp) -> bool {
        match self.neighbors.get_mut(id) {
            Some(entry) => {
                entry.last_heard = entry.last_heard.max(heard_at);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn get(&self, id: &VehicleId) -> Option<&NeighborEntry> {
        self.neighbors.get(id)
    }

    /// Sets the cached trust score shown for a neighbour.
    pub fn set_trust_score(&mut self, id: &VehicleId, score: f64) {
        if let Some(entry) = self.neighbors.get_mut(id) {
            entry.info.trust_score = score;
        }
    }

    /// Last reported position of `id`.
    #[must_use]
    pub fn last_position(&self, id: &VehicleId) -> Option<Position> {
        self.neighbors.get(id).map(|entry| entry.info.position)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.neighbors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NeighborEntry> {
        self.neighbors.values()
    }

    /// Returns `true` if `entry` was heard within `timeout` of `now`.
    #[must_use]
    pub fn is_live(entry: &NeighborEntry, now: Timestamp, timeout: Duration) -> bool {
        entry.last_heard.saturating_add(timeout) >= now
    }

    /// Drops neighbours not heard from within `timeout`.
    pub fn remove_stale(&mut self, now: Timestamp, timeout: Duration) -> usize {
        let before = self.neighbors.len();
        self.neighbors.retain(|id, entry| {
            let keep = Self::is_live(entry, now, timeout);
            if !keep {
                debug!(neighbor = %id, "Neighbor timed out");
            }
            keep
        });
        before - self.neighbors.len()
    }
}

impl std::fmt::Debug for NeighborTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NeighborTable")
            .field("neighbors", &self.count())
            .finish()
    }
}
