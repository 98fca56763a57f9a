//! # Voice Datagram Codec
//!
//! [`tokio_util::codec`] adapter so a UDP socket wrapped in
//! [`tokio_util::udp::UdpFramed`] yields and accepts whole [`VoicePacket`]s.
//!
//! One datagram is one packet. Datagrams that are not voice packets (IP
//! discovery replies, RTCP, truncated reads) are consumed and dropped instead
//! of ending the stream.

use crate::core::mode::EncryptionMode;
use crate::core::packet::VoicePacket;
use crate::core::rtp::is_rtp_header;
use crate::error::{Result, VoiceError};
use crate::utils::metrics::Metrics;
use bytes::BytesMut;
use std::sync::Arc;
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

/// Largest datagram sent by default (Ethernet MTU minus IP/UDP headers)
pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 1460;

/// Datagram codec for one negotiated encryption mode
#[derive(Debug, Clone)]
pub struct VoicePacketCodec {
    mode: EncryptionMode,
    max_datagram_size: usize,
    metrics: Arc<Metrics>,
}

impl VoicePacketCodec {
    pub fn new(mode: EncryptionMode) -> Self {
        Self {
            mode,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            metrics: Arc::new(Metrics::new()),
        }
    }

    pub fn with_max_datagram_size(mut self, max_datagram_size: usize) -> Self {
        self.max_datagram_size = max_datagram_size;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn mode(&self) -> EncryptionMode {
        self.mode
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}

impl Decoder for VoicePacketCodec {
    type Item = VoicePacket;
    type Error = VoiceError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if src.is_empty() {
            return Ok(None);
        }

        // The whole buffer is one datagram; take it regardless of outcome.
        let datagram = src.split().freeze();

        if !is_rtp_header(&datagram) {
            debug!(len = datagram.len(), "Dropping non-voice datagram");
            self.metrics.datagram_dropped();
            return Ok(None);
        }

        match VoicePacket::parse(datagram, self.mode) {
            Ok(packet) => {
                self.metrics.packet_decoded();
                Ok(Some(packet))
            }
            Err(e) => {
                debug!(error = %e, mode = self.mode.name(), "Dropping truncated voice datagram");
                self.metrics.datagram_dropped();
                Ok(None)
            }
        }
    }
}

impl Encoder<VoicePacket> for VoicePacketCodec {
    type Error = VoiceError;

    fn encode(&mut self, item: VoicePacket, dst: &mut BytesMut) -> Result<()> {
        let size = item.len();
        if size > self.max_datagram_size {
            return Err(VoiceError::OversizedPacket(size));
        }

        item.encode(self.mode, dst)?;
        self.metrics.packet_encoded();
        Ok(())
    }
}
