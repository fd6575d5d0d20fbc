// ============================================
// File: crates/vanet-routing/src/detection.rs
// ============================================
//! # Misbehaviour Heuristics
//!
//! ## Creation Reason
//! Black-hole and Sybil detection are judgement calls. Each is a trait
//! so a deployment can swap the criterion, with one default
//! implementation whose thresholds come from `[detection]`.
//!
//! ## Main Functionality
//! - `BlackHoleHeuristic` / `ForwardingRatioHeuristic`: a peer that keeps
//!   advertising routes but is rarely overheard forwarding what it was
//!   handed
//! - `SybilHeuristic` / `ColocationHeuristic`: several identities
//!   reporting the same spot at the same time, or sharing a certificate
//!
//! ## Watchdog Counters
//! ```text
//!   advertisements  ROUTE_REPLY received from the peer
//!   handed          DATA given to the peer for a further destination
//!   forwarded       that DATA overheard being retransmitted by the peer
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Heuristics are pure functions of the evidence they are given;
//!   counters live in the engine
//! - A flagged peer is penalised at read time only (`calculate_trust`)
//!
//! ## Last Modified
//! v0.1.0 - Initial heuristics

use std::fmt;

use serde::Serialize;

use crate::config::{BlackHoleConfig, SybilConfig};
use crate::model::VehicleInfo;

// ============================================
// Black hole
// ============================================

/// Forwarding evidence about one peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ForwardingCounters {
    /// Route replies received from the peer
    pub advertisements: u64,
    /// Packets handed to the peer for onward delivery
    pub handed: u64,
    /// Handed packets overheard being forwarded
    pub forwarded: u64,
}

impl ForwardingCounters {
    /// `forwarded / handed`, or 1.0 when nothing was handed.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn forward_ratio(&self) -> f64 {
        if self.handed == 0 {
            1.0
        } else {
            self.forwarded as f64 / self.handed as f64
        }
    }
}

/// Decides whether forwarding evidence indicates a black hole.
pub trait BlackHoleHeuristic: Send + Sync + fmt::Debug {
    /// Returns `true` if the peer behind `counters` looks like a black hole.
    fn is_black_hole(&self, counters: &ForwardingCounters) -> bool;
}

/// Flags peers that advertise routes yet forward too little.
#[derive(Debug, Clone, Copy)]
pub struct ForwardingRatioHeuristic {
    config: BlackHoleConfig,
}

impl ForwardingRatioHeuristic {
    #[must_use]
    pub const fn new(config: BlackHoleConfig) -> Self {
        Self { config }
    }
}

impl BlackHoleHeuristic for ForwardingRatioHeuristic {
    fn is_black_hole(&self, counters: &ForwardingCounters) -> bool {
        counters.advertisements >= self.config.min_advertisements
            && counters.handed >= self.config.min_packets_handed
            && counters.forward_ratio() < self.config.min_forward_ratio
    }
}

// ============================================
// Sybil
// ============================================

/// Decides whether an identity is one of several run by one node.
pub trait SybilHeuristic: Send + Sync + fmt::Debug {
    /// Returns `true` if `suspect` looks like a Sybil identity given the
    /// other live neighbours.
    fn is_sybil(&self, suspect: &VehicleInfo, others: &[&VehicleInfo]) -> bool;
}

/// Flags identities that share a spot or a certificate with others.
#[derive(Debug, Clone, Copy)]
pub struct ColocationHeuristic {
    config: SybilConfig,
}

impl ColocationHeuristic {
    #[must_use]
    pub const fn new(config: SybilConfig) -> Self {
        Self { config }
    }

    fn is_colocated(&self, a: &VehicleInfo, b: &VehicleInfo) -> bool {
        let apart_ms = a
            .position
            .timestamp
            .as_millis()
            .abs_diff(b.position.timestamp.as_millis());
        apart_ms <= self.config.window_ms
            && a.position.distance_to(&b.position) <= self.config.colocation_radius_m
    }
}

impl SybilHeuristic for ColocationHeuristic {
    fn is_sybil(&self, suspect: &VehicleInfo, others: &[&VehicleInfo]) -> bool {
        let others = others.iter().filter(|other| other.id != suspect.id);

        let mut colocated = 1;
        for other in others {
            if !suspect.certificate.is_empty() && other.certificate == suspect.certificate {
                return true;
            }
            if self.is_colocated(suspect, other) {
                colocated += 1;
            }
        }

        colocated > self.config.max_colocated_identities
    }
}
