// ============================================
// File: crates/vanet-routing/src/transport/mod.rs
// ============================================
//! # Harness Contracts
//!
//! ## Creation Reason
//! The engine does not own a radio or a mobility model. The simulation
//! harness provides both through the two narrow traits defined here.
//!
//! ## Main Functionality
//! - `Transport`: "deliver these bytes to this vehicle / broadcast them"
//! - `PositionSource`: "where is this vehicle now"
//! - [`memory`]: `MemoryTransport`, an in-memory outbox for tests
//!
//! ## Data Flow
//! ```text
//!   harness ──bytes──► SecureRoutingEngine::receive_message
//!                              │
//!                              ▼
//!   harness ◄──(Destination, Bytes)── Transport::send
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `send` is fire-and-forget: delivery guarantees belong to the harness
//! - Implementations must be Send + Sync so engines can live on worker
//!   threads; the engine itself is still driven by one caller at a time
//!
//! ## Last Modified
//! v0.1.0 - Initial contracts

pub mod error;
pub mod memory;

use std::fmt;

use bytes::Bytes;

use vanet_common::types::VehicleId;

use crate::model::Position;

pub use error::TransportError;
pub use memory::{MemoryTransport, OutboundFrame};

// ============================================
// Destination
// ============================================

/// Where an outbound frame should go.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Destination {
    /// A single neighbour.
    Unicast(VehicleId),
    /// Every vehicle in radio range.
    Broadcast,
}

impl Destination {
    /// Returns `true` for broadcast frames.
    #[must_use]
    pub const fn is_broadcast(&self) -> bool {
        matches!(self, Self::Broadcast)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unicast(id) => write!(f, "{id}"),
            Self::Broadcast => f.write_str("<broadcast>"),
        }
    }
}

// ============================================
// Traits
// ============================================

/// Outbound hand-off to the wireless medium.
pub trait Transport: Send + Sync {
    /// Hands a sealed frame to the medium.
    ///
    /// # Errors
    /// Returns a `TransportError` if the medium refuses the frame.
    fn send(&self, destination: Destination, frame: Bytes) -> Result<(), TransportError>;
}

/// Pull-style source of ground-truth vehicle positions.
pub trait PositionSource {
    /// Current position of `vehicle`, if the harness knows it.
    fn position(&self, vehicle: &VehicleId) -> Option<Position>;
}
