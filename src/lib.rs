//! # voice-link
//!
//! Packet framing and handshake gating for real-time voice clients.
//!
//! ## Overview
//! - [`core`]: stateless encode/validate/decode of the 12-byte RTP header,
//!   packet sizing and ciphertext extraction for the three encryption framings,
//!   nonce layout, and a Tokio datagram codec
//! - [`protocol`]: a capacity-bounded gate that serializes rate-limited
//!   identify handshakes, with self-expiring holds
//! - [`utils`]: cipher seam, logging setup, metrics
//!
//! Sockets, session orchestration and the handshake messages themselves live
//! with the caller; this crate only frames bytes and hands out permits.
//!
//! ## Example
//! ```rust
//! use voice_link::core::mode::EncryptionMode;
//! use voice_link::core::packet::{extract_ciphertext, packet_size, write_packet};
//! use voice_link::core::rtp::RtpHeader;
//! use bytes::BytesMut;
//!
//! let mode = EncryptionMode::Lite;
//! let mut buf = BytesMut::new();
//! write_packet(&RtpHeader::new(1, 960, 42), b"sealed", &[0, 0, 0, 1], mode, &mut buf)?;
//!
//! assert_eq!(buf.len(), packet_size(6, mode));
//! assert_eq!(extract_ciphertext(&buf, mode)?, b"sealed");
//! # Ok::<(), voice_link::error::VoiceError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod utils;

pub use crate::core::codec::VoicePacketCodec;
pub use crate::core::mode::EncryptionMode;
pub use crate::core::packet::VoicePacket;
pub use crate::core::rtp::RtpHeader;
pub use crate::error::{Result, VoiceError};
pub use crate::protocol::gate::{ConcurrencyGate, HoldId};
pub use crate::protocol::registry::GateRegistry;
