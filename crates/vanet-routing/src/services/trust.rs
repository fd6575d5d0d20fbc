// ============================================
// File: crates/vanet-routing/src/services/trust.rs
// ============================================
//! # Trust Table
//!
//! ## Creation Reason
//! Holds the durable per-peer trust score. Observations are folded in
//! with an exponential moving average so one bad (or good) event moves
//! the score without erasing history.
//!
//! ## Main Logical Flow
//! ```text
//!   new = α · observed + (1 − α) · old
//!   old = 1.0 for a peer seen for the first time
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `update` is the only mutation path; read-time penalties for
//!   suspected attacks are applied by the engine and never stored
//!
//! ## Last Modified
//! v0.1.0 - Initial trust table

use std::collections::HashMap;

use tracing::debug;

use vanet_common::types::VehicleId;

/// Score assumed for a peer before its first observation.
pub const INITIAL_TRUST: f64 = 1.0;

/// Per-peer trust scores.
#[derive(Debug, Clone)]
pub struct TrustTable {
    scores: HashMap<VehicleId, f64>,
    alpha: f64,
}

impl TrustTable {
    /// Creates an empty table with EMA weight `alpha`.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        Self {
            scores: HashMap::new(),
            alpha,
        }
    }

    /// Stored score of `id`, if any observation was made.
    #[must_use]
    pub fn score(&self, id: &VehicleId) -> Option<f64> {
        self.scores.get(id).copied()
    }

    /// Folds `observed` (clamped to [0, 1]) into the score of `id` and
    /// returns the new score.
    pub fn update(&mut self, id: &VehicleId, observed: f64) -> f64 {
        let observed = if observed.is_nan() { 0.0 } else { observed.clamp(0.0, 1.0) };
        let old = self.score(id).unwrap_or(INITIAL_TRUST);
        let new = (self.alpha * observed + (1.0 - self.alpha) * old).clamp(0.0, 1.0);
        self.scores.insert(id.clone(), new);
        debug!(vehicle = %id, observed, old, new, "Trust score updated");
        new
    }

    /// All stored scores.
    #[must_use]
    pub fn scores(&self) -> &HashMap<VehicleId, f64> {
        &self.scores
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.scores.len()
    }
}
