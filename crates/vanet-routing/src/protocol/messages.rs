// ============================================
// File: crates/vanet-routing/src/protocol/messages.rs
// ============================================
//! # Routing Message Definitions
//!
//! ## Creation Reason
//! Defines the five routing message kinds and the bodies they carry.
//!
//! ## Main Functionality
//! - `MessageType`: One byte identifying the kind of frame
//! - `MessageBody`: Closed set of bodies, one per kind
//! - `RoutingMessage`: Header fields plus body
//!
//! ## Body Layouts (Little Endian)
//! | Kind | Body | Destination field |
//! |------|------|-------------------|
//! | HELLO | x, y, z, position ts, speed, direction (48 bytes) | empty (broadcast) |
//! | ROUTE_REQUEST | empty | sought vehicle |
//! | ROUTE_REPLY | target id, 0x00, hop count u32 | requester |
//! | ROUTE_ERROR | empty | unreachable vehicle |
//! | DATA | application payload | final recipient |
//!
//! ## ⚠️ Important Note for Next Developer
//! - Type values are fixed by interoperating implementations
//! - Add new message types at end of enum to maintain compatibility
//!
//! ## Last Modified
//! v0.1.0 - Initial message definitions

use serde::{Deserialize, Serialize};

use vanet_common::time::Timestamp;
use vanet_common::types::VehicleId;

use crate::model::Position;

/// Size of a HELLO body in bytes.
pub const HELLO_BODY_SIZE: usize = 48;

/// Size of the hop count trailing a ROUTE_REPLY body.
pub const HOP_COUNT_SIZE: usize = 4;

// ============================================
// MessageType
// ============================================

/// Routing message type identifier.
///
/// # Values
/// | Value | Type |
/// |-------|------|
/// | 0x00 | Hello |
/// | 0x01 | RouteRequest |
/// | 0x02 | RouteReply |
/// | 0x03 | RouteError |
/// | 0x04 | Data |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Periodic beacon.
    Hello = 0x00,
    /// Route discovery request.
    RouteRequest = 0x01,
    /// Route discovery answer.
    RouteReply = 0x02,
    /// Route invalidation notice.
    RouteError = 0x03,
    /// Application payload.
    Data = 0x04,
}

impl MessageType {
    /// Converts a byte to a `MessageType`.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Self::Hello),
            0x01 => Some(Self::RouteRequest),
            0x02 => Some(Self::RouteReply),
            0x03 => Some(Self::RouteError),
            0x04 => Some(Self::Data),
            _ => None,
        }
    }

    /// Converts to its wire byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Conventional protocol name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Hello => "HELLO",
            Self::RouteRequest => "ROUTE_REQUEST",
            Self::RouteReply => "ROUTE_REPLY",
            Self::RouteError => "ROUTE_ERROR",
            Self::Data => "DATA",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_byte(value).ok_or(value)
    }
}

impl From<MessageType> for u8 {
    fn from(msg_type: MessageType) -> Self {
        msg_type.as_byte()
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================
// Bodies
// ============================================

/// Beacon contents: where the sender is and how it moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HelloBody {
    /// Reported position
    pub position: Position,
    /// Speed in m/s
    pub speed: f64,
    /// Heading in degrees
    pub direction: f64,
}

/// Route discovery answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReplyBody {
    /// Vehicle the route leads to
    pub target: VehicleId,
    /// Hops from the replier to `target`
    pub hop_count: u32,
}

/// Frame body, one variant per message kind.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// HELLO
    Hello(HelloBody),
    /// ROUTE_REQUEST
    RouteRequest,
    /// ROUTE_REPLY
    RouteReply(RouteReplyBody),
    /// ROUTE_ERROR
    RouteError,
    /// DATA
    Data(Vec<u8>),
}

impl MessageBody {
    /// Kind of frame this body belongs to.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Hello(_) => MessageType::Hello,
            Self::RouteRequest => MessageType::RouteRequest,
            Self::RouteReply(_) => MessageType::RouteReply,
            Self::RouteError => MessageType::RouteError,
            Self::Data(_) => MessageType::Data,
        }
    }
}

// ============================================
// RoutingMessage
// ============================================

/// A decoded routing frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingMessage {
    /// Originating vehicle
    pub source: VehicleId,
    /// Addressed vehicle, or broadcast (empty)
    pub destination: VehicleId,
    /// Frame creation time
    pub timestamp: Timestamp,
    /// Kind-specific contents
    pub body: MessageBody,
}

impl RoutingMessage {
    /// Creates a frame.
    #[must_use]
    pub fn new(source: VehicleId, destination: VehicleId, timestamp: Timestamp, body: MessageBody) -> Self {
        Self {
            source,
            destination,
            timestamp,
            body,
        }
    }

    /// Kind of this frame.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.body.message_type()
    }

    /// Returns `true` if the frame is addressed to every neighbour.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.destination.is_broadcast()
    }
}
