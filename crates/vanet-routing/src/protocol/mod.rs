// ============================================
// File: crates/vanet-routing/src/protocol/mod.rs
// ============================================
//! # Routing Protocol Framing
//!
//! ## Creation Reason
//! Every routing message is a small binary frame sealed inside a secure
//! envelope. This module owns the frame; the envelope belongs to
//! `vanet-crypto`.
//!
//! ## Main Functionality
//! - [`messages`]: Message kinds and their bodies
//! - [`codec`]: Binary encoding/decoding
//!
//! ## Layering
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ SecureMessage (vanet-crypto)             │
//! │   payload ─┐                             │
//! │            ▼                             │
//! │   ┌──────────────────────────────────┐   │
//! │   │ routing frame (this module)      │   │
//! │   │ header ‖ body                    │   │
//! │   └──────────────────────────────────┘   │
//! │   signature, timestamp, sequence, cert   │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol module

pub mod codec;
pub mod messages;

pub use codec::{create_routing_message, decode_message, encode_message, Codec, FrameCodec};
pub use messages::{HelloBody, MessageBody, MessageType, RouteReplyBody, RoutingMessage};
