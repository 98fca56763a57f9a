//! # RTP Header
//!
//! Fixed 12-byte header carried at the front of every voice packet.
//!
//! ```text
//! Offset  Len  Field
//! ------  ---  -----
//!  0       1   Flags     (0x80 = no extension, 0x90 = extension present)
//!  1       1   Version   (0x78)
//!  2       2   Sequence  (big-endian, wraps at 65536)
//!  4       4   Timestamp (big-endian, wraps at 2^32)
//!  8       4   SSRC      (big-endian)
//! ```
//!
//! The layout is fixed by the voice server and must be reproduced byte-exact.

use crate::error::{constants, Result, VoiceError};
use tracing::trace;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 12;

/// Flags byte of a header without an extension block
pub const RTP_NO_EXTENSION: u8 = 0x80;

/// Flags byte of a header followed by an extension block
pub const RTP_EXTENSION: u8 = 0x90;

/// Version byte every header carries
pub const RTP_VERSION: u8 = 0x78;

/// Profile marker of a one-byte-header extension block
pub const EXTENSION_PROFILE: [u8; 2] = [0xBE, 0xDE];

/// Decoded header fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RtpHeader {
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
    /// Set when the flags byte announced an extension block
    pub has_extension: bool,
}

impl RtpHeader {
    /// Header for an outgoing packet (outgoing packets never carry extensions)
    pub fn new(sequence: u16, timestamp: u32, ssrc: u32) -> Self {
        Self {
            sequence,
            timestamp,
            ssrc,
            has_extension: false,
        }
    }

    /// Header of the next frame from the same source.
    ///
    /// `samples` is the number of samples per channel in the frame just sent.
    #[inline]
    pub fn advance(&self, samples: u32) -> Self {
        Self {
            sequence: self.sequence.wrapping_add(1),
            timestamp: self.timestamp.wrapping_add(samples),
            ssrc: self.ssrc,
            has_extension: false,
        }
    }

    /// Write this header into the first 12 bytes of `target`
    pub fn encode_into(&self, target: &mut [u8]) -> Result<()> {
        encode_header(self.sequence, self.timestamp, self.ssrc, target)?;
        if self.has_extension {
            target[0] = RTP_EXTENSION;
        }
        Ok(())
    }

    /// Header as a fresh array
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        write_fields(self.sequence, self.timestamp, self.ssrc, &mut bytes);
        if self.has_extension {
            bytes[0] = RTP_EXTENSION;
        }
        bytes
    }

    /// Parse the header at the front of `source`
    pub fn decode(source: &[u8]) -> Result<Self> {
        decode_header(source)
    }
}

#[inline]
fn write_fields(sequence: u16, timestamp: u32, ssrc: u32, target: &mut [u8; HEADER_SIZE]) {
    target[0] = RTP_NO_EXTENSION;
    target[1] = RTP_VERSION;
    target[2..4].copy_from_slice(&sequence.to_be_bytes());
    target[4..8].copy_from_slice(&timestamp.to_be_bytes());
    target[8..12].copy_from_slice(&ssrc.to_be_bytes());
}

/// Write a no-extension header into the first 12 bytes of `target`.
///
/// Bytes past the header are left untouched.
///
/// # Errors
/// [`VoiceError::BufferTooShort`] if `target` holds fewer than 12 bytes.
pub fn encode_header(sequence: u16, timestamp: u32, ssrc: u32, target: &mut [u8]) -> Result<()> {
    let actual = target.len();
    let header: &mut [u8; HEADER_SIZE] = target
        .get_mut(..HEADER_SIZE)
        .and_then(|head| head.try_into().ok())
        .ok_or_else(|| {
            trace!(actual, "{}", constants::ERR_HEADER_TOO_SHORT);
            VoiceError::too_short(HEADER_SIZE, actual)
        })?;

    write_fields(sequence, timestamp, ssrc, header);
    Ok(())
}

/// Cheap check used to discriminate voice packets from other datagrams
/// sharing the socket before attempting a full parse.
#[inline]
pub fn is_rtp_header(source: &[u8]) -> bool {
    source.len() >= HEADER_SIZE
        && (source[0] == RTP_NO_EXTENSION || source[0] == RTP_EXTENSION)
        && source[1] == RTP_VERSION
}

/// Parse the header at the front of `source`.
///
/// # Errors
/// - [`VoiceError::BufferTooShort`] if `source` holds fewer than 12 bytes
/// - [`VoiceError::InvalidHeader`] if the flags or version byte is wrong
pub fn decode_header(source: &[u8]) -> Result<RtpHeader> {
    let header: &[u8; HEADER_SIZE] = source
        .get(..HEADER_SIZE)
        .and_then(|head| head.try_into().ok())
        .ok_or_else(|| VoiceError::too_short(HEADER_SIZE, source.len()))?;

    if (header[0] != RTP_NO_EXTENSION && header[0] != RTP_EXTENSION) || header[1] != RTP_VERSION {
        trace!(flags = header[0], version = header[1], "{}", constants::ERR_INVALID_HEADER);
        return Err(VoiceError::InvalidHeader);
    }

    Ok(RtpHeader {
        sequence: u16::from_be_bytes([header[2], header[3]]),
        timestamp: u32::from_be_bytes([header[4], header[5], header[6], header[7]]),
        ssrc: u32::from_be_bytes([header[8], header[9], header[10], header[11]]),
        has_extension: header[0] == RTP_EXTENSION,
    })
}

/// Skip the extension block at the front of a decrypted payload.
///
/// Only call this when the packet's header had [`RtpHeader::has_extension`]
/// set. The block is `[0xBE 0xDE] [Length(2, in 32-bit words)] [Data]`.
///
/// # Errors
/// - [`VoiceError::BufferTooShort`] if the block runs past the payload
/// - [`VoiceError::InvalidHeader`] if the profile marker is wrong
pub fn strip_header_extension(payload: &[u8]) -> Result<&[u8]> {
    if payload.len() < 4 {
        return Err(VoiceError::too_short(4, payload.len()));
    }
    if payload[..2] != EXTENSION_PROFILE {
        trace!(profile = ?&payload[..2], "{}", constants::ERR_INVALID_EXTENSION);
        return Err(VoiceError::InvalidHeader);
    }

    let words = u16::from_be_bytes([payload[2], payload[3]]) as usize;
    let end = 4 + words * 4;
    payload
        .get(end..)
        .ok_or_else(|| VoiceError::too_short(end, payload.len()))
}
