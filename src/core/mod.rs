//! # Core Framing Components
//!
//! Stateless packet handling for the voice transport.
//!
//! ## Components
//! - **RTP**: fixed 12-byte header encode/validate/decode
//! - **Mode**: the three encryption framings and their trailers
//! - **Packet**: sizing, ciphertext extraction and assembly
//! - **Nonce**: per-mode nonce layout and outgoing trailer generation
//! - **Codec**: Tokio datagram codec over whole packets
//!
//! ## Wire Format
//! ```text
//! [Flags(1)] [Version(1)] [Sequence(2)] [Timestamp(4)] [SSRC(4)] [Ciphertext(N)] [Trailer(0|24|4)]
//! ```
//!
//! Every function here is pure and safe to call from any number of tasks.

pub mod codec;
pub mod mode;
pub mod nonce;
pub mod packet;
pub mod rtp;
