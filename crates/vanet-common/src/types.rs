// ============================================
// File: crates/vanet-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Vehicles are named by opaque text identifiers that travel inside
//! routing frames as NUL-terminated strings. Wrapping them in a newtype
//! keeps the framing constraints in one place.
//!
//! ## Main Functionality
//! - `VehicleId`: Validated vehicle identifier
//!
//! ## ⚠️ Important Note for Next Developer
//! - An identifier may not contain a NUL byte (it is the frame delimiter)
//! - The empty identifier is reserved for broadcast destinations
//!
//! ## Last Modified
//! v0.1.0 - Initial type definitions

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Maximum encoded length of a vehicle identifier in bytes.
pub const MAX_VEHICLE_ID_LEN: usize = 255;

// ============================================
// VehicleId
// ============================================

/// Identifier of a vehicle in the network.
///
/// # Example
/// ```
/// use vanet_common::types::VehicleId;
///
/// let id = VehicleId::new("car-17").unwrap();
/// assert_eq!(id.as_str(), "car-17");
/// assert!(VehicleId::new("bad\0id").is_err());
/// assert!(VehicleId::broadcast().is_broadcast());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VehicleId(String);

impl VehicleId {
    /// Creates a validated identifier.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the identifier contains NUL or exceeds
    /// [`MAX_VEHICLE_ID_LEN`] bytes.
    pub fn new(id: impl Into<String>) -> Result<Self, CommonError> {
        let id = id.into();
        if id.contains('\0') {
            return Err(CommonError::invalid_input("vehicle_id", "contains NUL byte"));
        }
        if id.len() > MAX_VEHICLE_ID_LEN {
            return Err(CommonError::invalid_input(
                "vehicle_id",
                format!("{} bytes exceeds maximum of {MAX_VEHICLE_ID_LEN}", id.len()),
            ));
        }
        Ok(Self(id))
    }

    /// The broadcast destination (empty identifier).
    #[must_use]
    pub fn broadcast() -> Self {
        Self(String::new())
    }

    /// Returns `true` for the broadcast destination.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the identifier bytes as they appear on the wire.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            f.write_str("<broadcast>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl FromStr for VehicleId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for VehicleId {
    type Error = CommonError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl TryFrom<&str> for VehicleId {
    type Error = CommonError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<VehicleId> for String {
    fn from(id: VehicleId) -> Self {
        id.0
    }
}

impl AsRef<str> for VehicleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for VehicleId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// ============================================
// Tests
// ============================================
