// ============================================
// File: crates/vanet-common/src/time.rs
// ============================================
//! # Time Utilities
//!
//! ## Creation Reason
//! Every freshness window, route expiry and kinematic check is expressed
//! in milliseconds since the Unix epoch. This module gives those values a
//! type and routes every "now" through an injectable clock so protocol
//! behavior can be driven deterministically in tests.
//!
//! ## Main Functionality
//! - `Timestamp`: Unix time in milliseconds (`u64`, little-endian on the wire)
//! - `Clock`: Source of the current time
//! - `SystemClock`: Wall-clock implementation
//! - `ManualClock`: Settable clock for tests and simulations
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never call `SystemTime::now()` from protocol code; take a `Clock`
//! - Arithmetic on `Timestamp` saturates, it never wraps
//!
//! ## Last Modified
//! v0.1.0 - Initial time utilities

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================
// Timestamp
// ============================================

/// Milliseconds since the Unix epoch.
///
/// # Wire Format
/// ```text
/// ┌────────────────────────────────────┐
/// │   u64 little-endian (8 bytes)      │
/// └────────────────────────────────────┘
/// ```
///
/// # Example
/// ```
/// use vanet_common::time::Timestamp;
/// use std::time::Duration;
///
/// let t = Timestamp::from_millis(10_000);
/// assert_eq!(t.saturating_sub(Duration::from_secs(60)), Timestamp::ZERO);
/// assert_eq!(Timestamp::from_le_bytes(t.to_le_bytes()), t);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch.
    pub const ZERO: Self = Self(0);

    /// Size of the encoded timestamp in bytes.
    pub const ENCODED_LEN: usize = 8;

    /// Creates a timestamp from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// Little-endian encoding used in signatures and frames.
    #[must_use]
    pub const fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Decodes a little-endian timestamp.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    /// Adds a duration, saturating at `u64::MAX` milliseconds.
    #[must_use]
    pub fn saturating_add(&self, d: Duration) -> Self {
        Self(self.0.saturating_add(duration_millis(d)))
    }

    /// Subtracts a duration, saturating at the epoch.
    #[must_use]
    pub fn saturating_sub(&self, d: Duration) -> Self {
        Self(self.0.saturating_sub(duration_millis(d)))
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    #[must_use]
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    /// Signed difference `self - earlier` in seconds.
    ///
    /// Negative when `earlier` is actually later. Used by kinematic
    /// checks, which must reject non-positive intervals.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds_since(&self, earlier: Timestamp) -> f64 {
        if self.0 >= earlier.0 {
            (self.0 - earlier.0) as f64 / 1000.0
        } else {
            -((earlier.0 - self.0) as f64 / 1000.0)
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}

fn duration_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ============================================
// Clock
// ============================================

/// Source of the current time.
///
/// Implementations must be cheap to call; the routing engine reads the
/// clock on every received frame.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // A clock set before 1970 reads as the epoch.
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(duration_millis)
            .unwrap_or(0);
        Timestamp(millis)
    }
}

/// A clock that only moves when told to.
///
/// # Example
/// ```
/// use vanet_common::time::{Clock, ManualClock, Timestamp};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(Timestamp::from_millis(1_000));
/// clock.advance(Duration::from_millis(500));
/// assert_eq!(clock.now().as_millis(), 1_500);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    /// Sets the current time.
    pub fn set(&self, t: Timestamp) {
        self.millis.store(t.as_millis(), Ordering::SeqCst);
    }

    /// Moves the clock forward.
    pub fn advance(&self, d: Duration) {
        let step = duration_millis(d);
        let _ = self
            .millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |m| {
                Some(m.saturating_add(step))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}

// ============================================
// Tests
// ============================================
