//! # Nonce Layout
//!
//! Where the 24-byte cipher nonce of a packet comes from in each mode.
//!
//! - **Base**: the 12-byte header, zero-padded to 24 bytes
//! - **Suffix**: the 24-byte trailer, verbatim
//! - **Lite**: the 4-byte trailer counter, zero-padded to 24 bytes
//!
//! [`NonceGenerator`] produces the trailer for outgoing packets.

use crate::core::mode::{EncryptionMode, LITE_NONCE_SIZE, NONCE_SIZE};
use crate::core::packet::extract_trailer;
use crate::core::rtp::HEADER_SIZE;
use crate::error::{Result, VoiceError};
use std::sync::atomic::{AtomicU32, Ordering};

/// Reconstruct the cipher nonce of a received packet.
///
/// # Errors
/// [`VoiceError::BufferTooShort`] if the packet cannot hold a header and a trailer.
pub fn packet_nonce(packet: &[u8], mode: EncryptionMode) -> Result<[u8; NONCE_SIZE]> {
    let trailer = extract_trailer(packet, mode)?;
    let source = match mode {
        EncryptionMode::Base => &packet[..HEADER_SIZE],
        EncryptionMode::Suffix | EncryptionMode::Lite => trailer,
    };
    Ok(pad_nonce(source))
}

/// Nonce for an outgoing packet given its header bytes and trailer
pub fn outgoing_nonce(
    header: &[u8; HEADER_SIZE],
    trailer: &[u8],
    mode: EncryptionMode,
) -> Result<[u8; NONCE_SIZE]> {
    if trailer.len() != mode.trailer_size() {
        return Err(VoiceError::InvalidTrailer {
            expected: mode.trailer_size(),
            actual: trailer.len(),
        });
    }

    Ok(match mode {
        EncryptionMode::Base => pad_nonce(header),
        EncryptionMode::Suffix | EncryptionMode::Lite => pad_nonce(trailer),
    })
}

#[inline]
fn pad_nonce(source: &[u8]) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[..source.len()].copy_from_slice(source);
    nonce
}

/// Produces trailers for outgoing packets in one mode.
///
/// Lite counters start at zero and wrap; callers sharing a generator across
/// tasks still get distinct counters.
#[derive(Debug)]
pub struct NonceGenerator {
    mode: EncryptionMode,
    counter: AtomicU32,
}

impl NonceGenerator {
    pub fn new(mode: EncryptionMode) -> Self {
        Self {
            mode,
            counter: AtomicU32::new(0),
        }
    }

    pub fn mode(&self) -> EncryptionMode {
        self.mode
    }

    /// Trailer for the next outgoing packet (empty in base mode).
    ///
    /// # Errors
    /// [`VoiceError::Random`] if the OS random source fails in suffix mode.
    pub fn next_trailer(&self) -> Result<Vec<u8>> {
        match self.mode {
            EncryptionMode::Base => Ok(Vec::new()),
            EncryptionMode::Suffix => {
                let mut nonce = vec![0u8; NONCE_SIZE];
                getrandom::fill(&mut nonce).map_err(|e| VoiceError::Random(e.to_string()))?;
                Ok(nonce)
            }
            EncryptionMode::Lite => {
                let value = self.counter.fetch_add(1, Ordering::Relaxed);
                let mut nonce = vec![0u8; LITE_NONCE_SIZE];
                nonce.copy_from_slice(&value.to_be_bytes());
                Ok(nonce)
            }
        }
    }
}
