//! # Voice Packet Framing
//!
//! Sizing, slicing and assembly of complete voice packets.
//!
//! ## Wire Format
//! ```text
//! [Header(12)] [Ciphertext(N)] [Trailer(0 | 24 | 4)]
//! ```
//!
//! No padding and no alignment. Sizes and offsets are pure functions of the
//! ciphertext length and the [`EncryptionMode`].

use crate::core::mode::EncryptionMode;
use crate::core::rtp::{decode_header, RtpHeader, HEADER_SIZE};
use crate::error::{constants, Result, VoiceError};
use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

/// Total on-wire size of a packet carrying `ciphertext_len` encrypted bytes
#[inline]
pub const fn packet_size(ciphertext_len: usize, mode: EncryptionMode) -> usize {
    HEADER_SIZE + ciphertext_len + mode.trailer_size()
}

#[inline]
fn check_len(packet: &[u8], mode: EncryptionMode) -> Result<usize> {
    let minimum = packet_size(0, mode);
    if packet.len() < minimum {
        trace!(
            mode = mode.name(),
            len = packet.len(),
            "{}",
            constants::ERR_PACKET_TOO_SHORT
        );
        return Err(VoiceError::too_short(minimum, packet.len()));
    }
    Ok(packet.len() - mode.trailer_size())
}

/// Borrow the ciphertext between the header and the mode's trailer.
///
/// # Errors
/// [`VoiceError::BufferTooShort`] if the packet cannot hold a header and a trailer.
pub fn extract_ciphertext(packet: &[u8], mode: EncryptionMode) -> Result<&[u8]> {
    let end = check_len(packet, mode)?;
    Ok(&packet[HEADER_SIZE..end])
}

/// Borrow the mode's trailer at the end of the packet (empty in base mode)
pub fn extract_trailer(packet: &[u8], mode: EncryptionMode) -> Result<&[u8]> {
    let start = check_len(packet, mode)?;
    Ok(&packet[start..])
}

/// Append `header`, `ciphertext` and `trailer` to `dst` as one packet.
///
/// # Errors
/// [`VoiceError::InvalidTrailer`] if `trailer` is not exactly the mode's trailer size.
pub fn write_packet(
    header: &RtpHeader,
    ciphertext: &[u8],
    trailer: &[u8],
    mode: EncryptionMode,
    dst: &mut BytesMut,
) -> Result<()> {
    if trailer.len() != mode.trailer_size() {
        return Err(VoiceError::InvalidTrailer {
            expected: mode.trailer_size(),
            actual: trailer.len(),
        });
    }

    dst.reserve(packet_size(ciphertext.len(), mode));
    dst.put_slice(&header.to_bytes());
    dst.put_slice(ciphertext);
    dst.put_slice(trailer);
    Ok(())
}

/// A parsed voice packet whose regions share the datagram's allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoicePacket {
    pub header: RtpHeader,
    pub ciphertext: Bytes,
    pub trailer: Bytes,
}

impl VoicePacket {
    /// Split a received datagram into header, ciphertext and trailer without copying
    pub fn parse(mut datagram: Bytes, mode: EncryptionMode) -> Result<Self> {
        let header = decode_header(&datagram)?;
        let end = check_len(&datagram, mode)?;

        let trailer = datagram.split_off(end);
        let ciphertext = datagram.split_off(HEADER_SIZE);

        Ok(Self {
            header,
            ciphertext,
            trailer,
        })
    }

    /// On-wire size of this packet
    pub fn len(&self) -> usize {
        HEADER_SIZE + self.ciphertext.len() + self.trailer.len()
    }

    /// True when the packet carries no ciphertext
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }

    /// Append this packet to `dst` in wire format
    pub fn encode(&self, mode: EncryptionMode, dst: &mut BytesMut) -> Result<()> {
        write_packet(&self.header, &self.ciphertext, &self.trailer, mode, dst)
    }

    /// Wire bytes as a fresh buffer
    pub fn to_bytes(&self, mode: EncryptionMode) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.len());
        self.encode(mode, &mut buf)?;
        Ok(buf.freeze())
    }
}
