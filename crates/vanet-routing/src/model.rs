// ============================================
// File: crates/vanet-routing/src/model.rs
// ============================================
//! # Routing Data Model
//!
//! ## Creation Reason
//! Plain value types shared by the tables, the codec and the engine.
//!
//! ## Main Functionality
//! - `Position`: 3-D coordinates in metres plus the time they were taken
//! - `VehicleInfo`: What a vehicle knows about itself or a neighbour
//! - `RouteEntry`: Cached next hop towards a destination
//! - `MessageTracker`: Last accepted sequence number per sender
//!
//! ## Last Modified
//! v0.1.0 - Initial data model

use std::time::Duration;

use serde::{Deserialize, Serialize};

use vanet_common::time::Timestamp;
use vanet_common::types::VehicleId;

// ============================================
// Position
// ============================================

/// A located, timestamped point in the simulation frame (metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// East coordinate
    pub x: f64,
    /// North coordinate
    pub y: f64,
    /// Elevation
    pub z: f64,
    /// When the position was sampled
    pub timestamp: Timestamp,
}

impl Position {
    /// Creates a position.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, timestamp: Timestamp) -> Self {
        Self { x, y, z, timestamp }
    }

    /// Straight-line distance in metres.
    #[must_use]
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Returns `true` if every coordinate is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ============================================
// VehicleInfo
// ============================================

/// Identity, kinematic state and trust of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleInfo {
    /// Vehicle identifier
    pub id: VehicleId,
    /// Last accepted position
    pub position: Position,
    /// Speed in m/s
    pub speed: f64,
    /// Heading in degrees, counter-clockwise from the x axis
    pub direction: f64,
    /// Trust score in [0, 1]
    pub trust_score: f64,
    /// Encoded certificate, empty when none
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate: Vec<u8>,
}

impl VehicleInfo {
    /// Creates a stationary, fully trusted vehicle without a certificate.
    #[must_use]
    pub fn new(id: VehicleId, position: Position) -> Self {
        Self {
            id,
            position,
            speed: 0.0,
            direction: 0.0,
            trust_score: 1.0,
            certificate: Vec::new(),
        }
    }
}

// ============================================
// RouteEntry
// ============================================

/// Cached route towards one destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEntry {
    /// Neighbour to hand packets to
    pub next_hop: VehicleId,
    /// Hops to the destination through `next_hop`
    pub hop_count: u32,
    /// When the route was learned
    pub timestamp: Timestamp,
    /// Trust of `next_hop` when the route was learned
    pub trust_score: f64,
}

impl RouteEntry {
    /// Creates a route entry.
    #[must_use]
    pub fn new(next_hop: VehicleId, hop_count: u32, timestamp: Timestamp, trust_score: f64) -> Self {
        Self {
            next_hop,
            hop_count,
            timestamp,
            trust_score,
        }
    }

    /// Returns `true` once `timestamp + timeout < now`.
    #[must_use]
    pub fn is_expired(&self, now: Timestamp, timeout: Duration) -> bool {
        self.timestamp.saturating_add(timeout) < now
    }
}

// ============================================
// MessageTracker
// ============================================

/// Sequence bookkeeping for one sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTracker {
    /// Highest accepted sequence number
    pub last_sequence: u32,
    /// When it was accepted
    pub last_update: Timestamp,
}
