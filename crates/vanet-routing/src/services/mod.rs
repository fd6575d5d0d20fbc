// ============================================
// File: crates/vanet-routing/src/services/mod.rs
// ============================================
//! # Engine State Services
//!
//! ## Creation Reason
//! Keeps each piece of per-vehicle protocol state behind a small,
//! separately testable type. The engine composes them.
//!
//! ### Submodules
//! - [`routes`]: Destination → next hop
//! - [`neighbors`]: Vehicles in radio range and their last two positions
//! - [`trust`]: Durable trust scores (EMA)
//! - [`sequence`]: Highest accepted sequence number per sender
//!
//! ## Service Architecture
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                 SecureRoutingEngine                   │
//! ├───────────────────────────────────────────────────────┤
//! │  ┌──────────────┐   ┌──────────────┐                  │
//! │  │ RouteTable   │   │ NeighborTable│◄── beacons       │
//! │  └──────▲───────┘   └──────┬───────┘                  │
//! │         │ replies          │ positions                │
//! │  ┌──────┴───────┐   ┌──────▼───────┐                  │
//! │  │SequenceTracker│  │  TrustTable  │◄── observations  │
//! │  └──────────────┘   └──────────────┘                  │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - These types hold no locks; the engine has exactly one owner
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod neighbors;
pub mod routes;
pub mod sequence;
pub mod trust;

// Re-export primary types
pub use neighbors::{NeighborEntry, NeighborTable};
pub use routes::RouteTable;
pub use sequence::SequenceTracker;
pub use trust::TrustTable;
