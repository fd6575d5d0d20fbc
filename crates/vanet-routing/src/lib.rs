// ============================================
// File: crates/vanet-routing/src/lib.rs
// ============================================
//! # VANET Routing - Trust-Aware Secure Routing Engine
//!
//! ## Creation Reason
//! Vehicles relay each other's traffic over short-lived wireless links.
//! This crate decides, per vehicle, which neighbours are believable and
//! which routes are safe, on top of the authenticated envelopes provided
//! by `vanet-crypto`.
//!
//! ## Main Functionality
//! - [`engine`]: `SecureRoutingEngine`, one per vehicle
//! - [`protocol`]: HELLO / ROUTE_REQUEST / ROUTE_REPLY / ROUTE_ERROR / DATA
//!   frames and their codec
//! - [`services`]: Route, neighbour, trust and sequence tables
//! - [`kinematics`]: Speed and acceleration plausibility
//! - [`detection`]: Pluggable black-hole and Sybil heuristics
//! - [`transport`]: Outbound seam and an in-memory implementation
//! - [`config`]: TOML protocol configuration
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │   harness / simulator (positions, ticks, radio)     │
//! │                    │                                │
//! │                    ▼                                │
//! │              vanet-routing  ◄── You are here        │
//! │                    │                                │
//! │                    ▼                                │
//! │              vanet-crypto                           │
//! │                    │                                │
//! │                    ▼                                │
//! │              vanet-common                           │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The engine is synchronous and single-owner; the harness calls it
//!   from one thread per vehicle and owns every timer
//! - Time always comes from the injected `Clock`, never the OS directly
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod detection;
pub mod engine;
pub mod error;
pub mod kinematics;
pub mod model;
pub mod protocol;
pub mod services;
pub mod stats;
pub mod transport;

// Re-export commonly used items
pub use config::ProtocolConfig;
pub use detection::{
    BlackHoleHeuristic, ColocationHeuristic, ForwardingCounters, ForwardingRatioHeuristic,
    SybilHeuristic,
};
pub use engine::{DeliveredMessage, PruneReport, SecureRoutingEngine, SendOutcome};
pub use error::{Result, RoutingError};
pub use kinematics::{check_movement, is_valid_movement, KinematicLimits, MovementVerdict};
pub use model::{Position, RouteEntry, VehicleInfo};
pub use protocol::MessageType;
pub use stats::ProtocolStats;
pub use transport::{Destination, MemoryTransport, PositionSource, Transport, TransportError};
