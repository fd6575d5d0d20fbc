// ============================================
// File: crates/vanet-routing/src/kinematics.rs
// ============================================
//! # Kinematic Plausibility
//!
//! ## Creation Reason
//! A vehicle cannot teleport. Both our own position updates and the
//! positions peers report in beacons are checked against the same
//! physical limits before they are believed.
//!
//! ## Main Logical Flow
//! ```text
//!   Δt = new.t - old.t          (seconds, must be > 0)
//!   d  = |new - old|            (metres)
//!   v  = d / Δt                 (m/s)
//!   reject if v · 3.6 > max_speed_kmh
//!   a  = v / Δt                 (m/s², acceleration from rest)
//!   reject if a > max_acceleration
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Both limits are inclusive: exactly 200 km/h is accepted
//! - Non-finite coordinates are rejected before any arithmetic
//! - The acceleration term assumes a start from rest, so short sampling
//!   intervals constrain speed more tightly than `max_speed_kmh` does
//!
//! ## Last Modified
//! v0.1.0 - Initial kinematic check

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::Position;

/// Conversion factor from m/s to km/h.
pub const MS_TO_KMH: f64 = 3.6;

// ============================================
// KinematicLimits
// ============================================

/// Physical limits for plausible motion (`[kinematics]` section).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KinematicLimits {
    /// Maximum speed in km/h.
    #[serde(default = "default_max_speed_kmh")]
    pub max_speed_kmh: f64,

    /// Maximum acceleration in m/s².
    #[serde(default = "default_max_acceleration")]
    pub max_acceleration: f64,
}

fn default_max_speed_kmh() -> f64 {
    200.0
}

fn default_max_acceleration() -> f64 {
    10.0
}

impl KinematicLimits {
    /// Validates the section.
    ///
    /// # Errors
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.max_speed_kmh.is_finite() && self.max_speed_kmh > 0.0) {
            return Err("max_speed_kmh must be a positive number".to_string());
        }
        if !(self.max_acceleration.is_finite() && self.max_acceleration > 0.0) {
            return Err("max_acceleration must be a positive number".to_string());
        }
        Ok(())
    }
}

impl Default for KinematicLimits {
    fn default() -> Self {
        Self {
            max_speed_kmh: default_max_speed_kmh(),
            max_acceleration: default_max_acceleration(),
        }
    }
}

// ============================================
// Movement check
// ============================================

/// Outcome of a movement check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovementVerdict {
    /// Transition is physically plausible.
    Valid,
    /// A coordinate is NaN or infinite.
    NonFinite,
    /// The new sample is not later than the old one.
    NonPositiveInterval {
        /// Elapsed seconds
        seconds: f64,
    },
    /// Implied speed above the limit.
    TooFast {
        /// Implied speed in km/h
        speed_kmh: f64,
    },
    /// Implied acceleration above the limit.
    TooMuchAcceleration {
        /// Implied acceleration in m/s²
        acceleration: f64,
    },
}

impl MovementVerdict {
    /// Returns `true` for [`MovementVerdict::Valid`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for MovementVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::NonFinite => f.write_str("non-finite coordinates"),
            Self::NonPositiveInterval { seconds } => {
                write!(f, "non-positive interval of {seconds:.3}s")
            }
            Self::TooFast { speed_kmh } => write!(f, "implied speed {speed_kmh:.1} km/h"),
            Self::TooMuchAcceleration { acceleration } => {
                write!(f, "implied acceleration {acceleration:.2} m/s²")
            }
        }
    }
}

/// Classifies the transition from `old` to `new`.
#[must_use]
pub fn check_movement(old: &Position, new: &Position, limits: &KinematicLimits) -> MovementVerdict {
    if !old.is_finite() || !new.is_finite() {
        return MovementVerdict::NonFinite;
    }

    let seconds = new.timestamp.seconds_since(old.timestamp);
    if seconds <= 0.0 {
        return MovementVerdict::NonPositiveInterval { seconds };
    }

    let speed = old.distance_to(new) / seconds;
    let speed_kmh = speed * MS_TO_KMH;
    if speed_kmh > limits.max_speed_kmh {
        return MovementVerdict::TooFast { speed_kmh };
    }

    let acceleration = speed / seconds;
    if acceleration > limits.max_acceleration {
        return MovementVerdict::TooMuchAcceleration { acceleration };
    }

    MovementVerdict::Valid
}

/// Returns `true` if moving from `old` to `new` is physically plausible.
#[must_use]
pub fn is_valid_movement(old: &Position, new: &Position, limits: &KinematicLimits) -> bool {
    check_movement(old, new, limits).is_valid()
}

/// Speed (m/s) and heading (degrees) implied by a valid transition.
#[must_use]
pub fn implied_motion(old: &Position, new: &Position) -> (f64, f64) {
    let seconds = new.timestamp.seconds_since(old.timestamp);
    if seconds <= 0.0 {
        return (0.0, 0.0);
    }
    let speed = old.distance_to(new) / seconds;
    let heading = (new.y - old.y).atan2(new.x - old.x).to_degrees();
    (speed, heading)
}
