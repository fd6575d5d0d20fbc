// ============================================
// File: crates/vanet-common/src/lib.rs
// ============================================
//! # VANET Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides foundational types and utilities shared by the cryptographic
//! message layer and the routing engine, so both agree on identifiers,
//! time and error conventions.
//!
//! ## Main Functionality
//! - [`types`]: Vehicle identifiers (`VehicleId`)
//! - [`time`]: Millisecond timestamps and the injectable `Clock`
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              vanet-routing                          │
//! │                    │                                │
//! │                    ▼                                │
//! │              vanet-crypto                           │
//! │                    │                                │
//! │                    ▼                                │
//! │              vanet-common  ◄── You are here         │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal
//! - Protocol code must read time through a `Clock`, never directly
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use time::{Clock, ManualClock, SystemClock, Timestamp};
pub use types::VehicleId;
