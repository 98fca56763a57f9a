//! # Error Types
//!
//! Error handling for voice packet framing and handshake gating.
//!
//! Every fallible operation in this crate returns [`Result`], whose error side is
//! [`VoiceError`]. The variants map onto three families:
//!
//! ## Error Categories
//! - **Framing Errors**: short buffers, corrupt or foreign headers, bad trailers
//! - **Mode Errors**: encryption mode names or tags this crate does not support
//! - **Runtime Errors**: cipher failures, RNG failures, closed gates, I/O
//!
//! Framing and mode errors indicate a corrupt packet or a caller/configuration
//! bug. None of them are retried internally.
//!
//! ## Example Usage
//! ```rust
//! use voice_link::core::rtp::decode_header;
//! use voice_link::error::VoiceError;
//! use tracing::{debug, warn};
//!
//! fn inspect(datagram: &[u8]) {
//!     match decode_header(datagram) {
//!         Ok(header) => debug!(ssrc = header.ssrc, "voice packet"),
//!         Err(VoiceError::InvalidHeader) => debug!("foreign datagram"),
//!         Err(e) => warn!(error = %e, "unusable datagram"),
//!     }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Framing errors
    pub const ERR_HEADER_TOO_SHORT: &str = "Header buffer is too short";
    pub const ERR_PACKET_TOO_SHORT: &str = "Packet is too short for its encryption mode";
    pub const ERR_INVALID_HEADER: &str = "Invalid RTP header";
    pub const ERR_INVALID_EXTENSION: &str = "Invalid RTP header extension";

    /// Mode errors
    pub const ERR_UNSUPPORTED_MODE: &str = "Unsupported encryption mode";
    pub const ERR_NO_COMMON_MODE: &str = "No supported encryption mode was offered";

    /// Gate errors
    pub const ERR_ZERO_CAPACITY: &str = "Gate capacity must be greater than 0";
    pub const ERR_NO_RUNTIME: &str = "Gate must be created inside a Tokio runtime";

    /// Cryptographic errors
    pub const ERR_DECRYPTION_FAILED: &str = "Decryption failed";
    pub const ERR_INVALID_KEY: &str = "Secret key must be 32 bytes";
}

/// VoiceError is the error type for every operation in this crate
#[derive(Error, Debug, Serialize, Deserialize)]
pub enum VoiceError {
    #[error("I/O error: {0}")]
    #[serde(skip_serializing, skip_deserializing)]
    Io(#[from] io::Error),

    #[error("Buffer too short: {required} bytes required, {actual} available")]
    BufferTooShort { required: usize, actual: usize },

    #[error("Invalid RTP header")]
    InvalidHeader,

    #[error("Invalid trailer: expected {expected} bytes, got {actual}")]
    InvalidTrailer { expected: usize, actual: usize },

    #[error("Unsupported encryption mode: {0}")]
    UnsupportedMode(String),

    #[error("Packet too large: {0} bytes")]
    OversizedPacket(usize),

    #[error("Encryption failed")]
    EncryptionFailure,

    #[error("Decryption failed")]
    DecryptionFailure,

    #[error("Random source failed: {0}")]
    Random(String),

    /// Reserved for a closed gate semaphore. Gates never close theirs, so
    /// `acquire` does not produce this today.
    #[error("Concurrency gate closed")]
    GateClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl VoiceError {
    /// Shorthand for the length error raised by every slicing operation
    pub(crate) fn too_short(required: usize, actual: usize) -> Self {
        VoiceError::BufferTooShort { required, actual }
    }
}

/// Type alias for Results using VoiceError
pub type Result<T> = std::result::Result<T, VoiceError>;
