// ============================================
// File: crates/vanet-routing/src/error.rs
// ============================================
//! # Routing Error Types
//!
//! ## Main Functionality
//! `RoutingError` covers every rejected engine operation. Authentication
//! failures collapse into a single `VerificationFailure` so callers cannot
//! learn which check an envelope failed.
//!
//! ## Last Modified
//! v0.1.0 - Initial routing errors

use thiserror::Error;

use vanet_common::error::CommonError;
use vanet_common::types::VehicleId;
use vanet_crypto::error::CryptoError;

use crate::transport::TransportError;

/// Result type for routing operations.
pub type Result<T> = std::result::Result<T, RoutingError>;

/// Routing engine error types.
#[derive(Error, Debug)]
pub enum RoutingError {
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    #[error("Vehicle identity mismatch: engine is {expected}, got {actual}")]
    IdentityMismatch {
        expected: VehicleId,
        actual: VehicleId,
    },

    #[error("Vehicle has not been initialized")]
    NotInitialized,

    #[error("Implausible movement rejected: {reason}")]
    InvalidMovement {
        reason: String,
    },

    #[error("Next hop {next_hop} is not trusted (score {trust:.3})")]
    UntrustedNextHop {
        next_hop: VehicleId,
        trust: f64,
    },

    #[error("Message verification failed")]
    VerificationFailure,

    #[error("Route to {destination} rejected: {reason}")]
    RouteRejected {
        destination: VehicleId,
        reason: String,
    },

    #[error("No route to {destination}")]
    NoRoute {
        destination: VehicleId,
    },

    #[error("Malformed message: {reason}")]
    MalformedMessage {
        reason: String,
    },

    #[error("Unknown message type: 0x{0:02x}")]
    UnknownMessageType(u8),

    #[error("Dropped own transmission")]
    Loopback,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl RoutingError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_movement(reason: impl Into<String>) -> Self {
        Self::InvalidMovement {
            reason: reason.into(),
        }
    }

    pub fn route_rejected(destination: &VehicleId, reason: impl Into<String>) -> Self {
        Self::RouteRejected {
            destination: destination.clone(),
            reason: reason.into(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigLoad { .. } | Self::ConfigInvalid { .. })
    }

    /// Returns `true` for conditions that point at a hostile or broken peer.
    #[must_use]
    pub fn is_suspicious(&self) -> bool {
        match self {
            Self::VerificationFailure
            | Self::MalformedMessage { .. }
            | Self::UnknownMessageType(_)
            | Self::UntrustedNextHop { .. } => true,
            Self::Crypto(e) => e.is_suspicious(),
            _ => false,
        }
    }

    /// Only a vehicle that cannot obtain a signing key is unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Crypto(e) => e.is_fatal(),
            _ => false,
        }
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }
}
