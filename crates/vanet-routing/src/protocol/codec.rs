// ============================================
// File: crates/vanet-routing/src/protocol/codec.rs
// ============================================
//! # Routing Frame Codec
//!
//! ## Creation Reason
//! Provides the binary framing carried inside every secure envelope.
//!
//! ## Wire Format
//! ```text
//! ┌──────┬───────────┬──────┬────────────────┬──────┬───────────┬──────┐
//! │ type │ source id │ 0x00 │ destination id │ 0x00 │ ts u64 LE │ body │
//! │  1B  │  UTF-8    │      │ UTF-8 (or "")  │      │    8B     │  ..  │
//! └──────┴───────────┴──────┴────────────────┴──────┴───────────┴──────┘
//! ```
//!
//! ## Parsing Strategy
//! 1. Read message type byte
//! 2. Read two NUL-terminated identifiers
//! 3. Read the timestamp
//! 4. Dispatch the remaining bytes to the type-specific body parser
//!
//! ## ⚠️ Important Note for Next Developer
//! - The header layout must round-trip byte for byte; other
//!   implementations build it independently
//! - Fixed-size bodies reject both short and long input
//!
//! ## Last Modified
//! v0.1.0 - Initial codec implementation

use bytes::{Buf, BufMut, Bytes, BytesMut};

use vanet_common::time::Timestamp;
use vanet_common::types::VehicleId;

use crate::error::{Result, RoutingError};
use crate::model::Position;
use crate::protocol::messages::{
    HelloBody, MessageBody, MessageType, RouteReplyBody, RoutingMessage, HELLO_BODY_SIZE,
    HOP_COUNT_SIZE,
};

/// Smallest possible frame: type, two empty identifiers, timestamp.
pub const MIN_FRAME_SIZE: usize = 1 + 1 + 1 + Timestamp::ENCODED_LEN;

// ============================================
// Codec Trait
// ============================================

/// Trait for encoding and decoding protocol messages.
///
/// # Type Parameters
/// * `T` - The message type to encode/decode
pub trait Codec<T> {
    /// Encodes a message into a byte buffer.
    fn encode(&self, msg: &T, buf: &mut BytesMut);

    /// Decodes a message from bytes.
    ///
    /// # Errors
    /// Returns an error if the bytes are not a valid `T`.
    fn decode(&self, buf: &mut Bytes) -> Result<T>;
}

// ============================================
// Free functions
// ============================================

/// Builds a raw frame: header followed by `payload`.
///
/// # Example
/// ```
/// use vanet_common::{Timestamp, VehicleId};
/// use vanet_routing::protocol::{create_routing_message, MessageType};
///
/// let frame = create_routing_message(
///     MessageType::Data,
///     &VehicleId::new("a").unwrap(),
///     &VehicleId::new("b").unwrap(),
///     Timestamp::from_millis(1),
///     b"hi",
/// );
/// assert_eq!(&frame[..], b"\x04a\0b\0\x01\0\0\0\0\0\0\0hi");
/// ```
#[must_use]
pub fn create_routing_message(
    message_type: MessageType,
    source: &VehicleId,
    destination: &VehicleId,
    timestamp: Timestamp,
    payload: &[u8],
) -> Bytes {
    let mut buf = BytesMut::with_capacity(
        MIN_FRAME_SIZE + source.as_bytes().len() + destination.as_bytes().len() + payload.len(),
    );
    put_header(&mut buf, message_type, source, destination, timestamp);
    buf.put_slice(payload);
    buf.freeze()
}

/// Encodes a frame with the default codec.
#[must_use]
pub fn encode_message(msg: &RoutingMessage) -> Bytes {
    let mut buf = BytesMut::new();
    FrameCodec.encode(msg, &mut buf);
    buf.freeze()
}

/// Decodes a frame with the default codec.
///
/// # Errors
/// Returns `MalformedMessage` or `UnknownMessageType`.
pub fn decode_message(bytes: &[u8]) -> Result<RoutingMessage> {
    FrameCodec.decode(&mut Bytes::copy_from_slice(bytes))
}

fn put_header(
    buf: &mut BytesMut,
    message_type: MessageType,
    source: &VehicleId,
    destination: &VehicleId,
    timestamp: Timestamp,
) {
    buf.put_u8(message_type.as_byte());
    buf.put_slice(source.as_bytes());
    buf.put_u8(0);
    buf.put_slice(destination.as_bytes());
    buf.put_u8(0);
    buf.put_slice(&timestamp.to_le_bytes());
}

fn get_id(buf: &mut Bytes, what: &str) -> Result<VehicleId> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| RoutingError::malformed(format!("{what} id is not NUL-terminated")))?;
    let raw = buf.split_to(end);
    buf.advance(1);

    let text = std::str::from_utf8(&raw)
        .map_err(|_| RoutingError::malformed(format!("{what} id is not UTF-8")))?;
    VehicleId::new(text).map_err(|e| RoutingError::malformed(format!("{what} id: {e}")))
}

// ============================================
// FrameCodec
// ============================================

/// Codec for routing frames.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameCodec;

impl FrameCodec {
    /// Creates a new frame codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Identifies the message type from a buffer without consuming it.
    ///
    /// # Errors
    /// Returns an error for an empty buffer or unknown type byte.
    pub fn peek_message_type(buf: &[u8]) -> Result<MessageType> {
        let first = *buf
            .first()
            .ok_or_else(|| RoutingError::malformed("empty frame"))?;
        MessageType::from_byte(first).ok_or(RoutingError::UnknownMessageType(first))
    }

    fn encode_body(body: &MessageBody, buf: &mut BytesMut) {
        match body {
            MessageBody::Hello(hello) => {
                buf.reserve(HELLO_BODY_SIZE);
                buf.put_f64_le(hello.position.x);
                buf.put_f64_le(hello.position.y);
                buf.put_f64_le(hello.position.z);
                buf.put_u64_le(hello.position.timestamp.as_millis());
                buf.put_f64_le(hello.speed);
                buf.put_f64_le(hello.direction);
            }
            MessageBody::RouteRequest | MessageBody::RouteError => {}
            MessageBody::RouteReply(reply) => {
                buf.put_slice(reply.target.as_bytes());
                buf.put_u8(0);
                buf.put_u32_le(reply.hop_count);
            }
            MessageBody::Data(payload) => buf.put_slice(payload),
        }
    }

    fn decode_body(message_type: MessageType, buf: &mut Bytes) -> Result<MessageBody> {
        let body = match message_type {
            MessageType::Hello => {
                if buf.len() != HELLO_BODY_SIZE {
                    return Err(RoutingError::malformed(format!(
                        "HELLO body must be {HELLO_BODY_SIZE} bytes, got {}",
                        buf.len()
                    )));
                }
                let x = buf.get_f64_le();
                let y = buf.get_f64_le();
                let z = buf.get_f64_le();
                let timestamp = Timestamp::from_millis(buf.get_u64_le());
                let speed = buf.get_f64_le();
                let direction = buf.get_f64_le();
                MessageBody::Hello(HelloBody {
                    position: Position::new(x, y, z, timestamp),
                    speed,
                    direction,
                })
            }
            MessageType::RouteRequest | MessageType::RouteError => {
                if !buf.is_empty() {
                    return Err(RoutingError::malformed(format!(
                        "{message_type} carries no body, got {} bytes",
                        buf.len()
                    )));
                }
                if message_type == MessageType::RouteRequest {
                    MessageBody::RouteRequest
                } else {
                    MessageBody::RouteError
                }
            }
            MessageType::RouteReply => {
                let target = get_id(buf, "target")?;
                if buf.len() != HOP_COUNT_SIZE {
                    return Err(RoutingError::malformed(format!(
                        "ROUTE_REPLY hop count must be {HOP_COUNT_SIZE} bytes, got {}",
                        buf.len()
                    )));
                }
                MessageBody::RouteReply(RouteReplyBody {
                    target,
                    hop_count: buf.get_u32_le(),
                })
            }
            MessageType::Data => MessageBody::Data(buf.to_vec()),
        };
        Ok(body)
    }
}

impl Codec<RoutingMessage> for FrameCodec {
    fn encode(&self, msg: &RoutingMessage, buf: &mut BytesMut) {
        put_header(buf, msg.message_type(), &msg.source, &msg.destination, msg.timestamp);
        Self::encode_body(&msg.body, buf);
    }

    fn decode(&self, buf: &mut Bytes) -> Result<RoutingMessage> {
        if buf.len() < MIN_FRAME_SIZE {
            return Err(RoutingError::malformed(format!(
                "frame too short: expected at least {MIN_FRAME_SIZE} bytes, got {}",
                buf.len()
            )));
        }

        let message_type = Self::peek_message_type(buf)?;
        buf.advance(1);

        let source = get_id(buf, "source")?;
        let destination = get_id(buf, "destination")?;

        if buf.len() < Timestamp::ENCODED_LEN {
            return Err(RoutingError::malformed("frame truncated before timestamp"));
        }
        let timestamp = Timestamp::from_millis(buf.get_u64_le());

        let body = Self::decode_body(message_type, buf)?;

        Ok(RoutingMessage {
            source,
            destination,
            timestamp,
            body,
        })
    }
}
