// ============================================
// File: crates/vanet-routing/src/transport/memory.rs
// ============================================
//! # In-Memory Transport
//!
//! ## Creation Reason
//! Lets tests and simple harnesses capture what an engine transmits
//! without a radio. Clones share one outbox, so a test can keep a handle
//! while the engine owns another.
//!
//! ## Usage in Tests
//! ```ignore
//! let transport = MemoryTransport::new();
//! let mut engine = SecureRoutingEngine::new(id, config, clock, Box::new(transport.clone()))?;
//! engine.send_beacon()?;
//! let frames = transport.take_sent();
//! assert!(frames[0].destination.is_broadcast());
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - The outbox is bounded; a full outbox reports `QueueFull`
//!
//! ## Last Modified
//! v0.1.0 - Initial in-memory transport

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use super::{Destination, Transport, TransportError};

/// Maximum number of frames held in the outbox.
pub const MAX_QUEUE_SIZE: usize = 1000;

/// A frame captured by [`MemoryTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    /// Requested destination
    pub destination: Destination,
    /// Sealed envelope bytes
    pub bytes: Bytes,
}

/// Transport that records frames instead of transmitting them.
#[derive(Clone)]
pub struct MemoryTransport {
    outbox: Arc<Mutex<VecDeque<OutboundFrame>>>,
    capacity: usize,
}

impl MemoryTransport {
    /// Creates a transport with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_QUEUE_SIZE)
    }

    /// Creates a transport holding at most `capacity` frames.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            outbox: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(100)))),
            capacity,
        }
    }

    /// Drains and returns every captured frame.
    pub fn take_sent(&self) -> Vec<OutboundFrame> {
        self.outbox.lock().drain(..).collect()
    }

    /// Number of frames waiting in the outbox.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.outbox.lock().len()
    }

    /// Discards every captured frame.
    pub fn clear(&self) {
        self.outbox.lock().clear();
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, destination: Destination, frame: Bytes) -> Result<(), TransportError> {
        let mut outbox = self.outbox.lock();
        if outbox.len() >= self.capacity {
            return Err(TransportError::QueueFull {
                capacity: self.capacity,
            });
        }
        trace!(destination = %destination, len = frame.len(), "Frame captured");
        outbox.push_back(OutboundFrame {
            destination,
            bytes: frame,
        });
        Ok(())
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTransport")
            .field("queued", &self.sent_count())
            .field("capacity", &self.capacity)
            .finish()
    }
}
