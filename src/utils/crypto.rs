//! # Packet Encryption
//!
//! The cipher itself is opaque to the framing layer: anything implementing
//! [`PacketCipher`] can seal and open packets as long as it takes a 24-byte
//! nonce. This module pairs a cipher with the per-mode nonce layout.
//!
//! Two implementations are bundled:
//! - [`XSalsaCipher`]: XSalsa20-Poly1305 in NaCl `crypto_secretbox` layout
//!   (tag before ciphertext). This is what the `xsalsa20_poly1305*` modes
//!   mean on the wire; use it against voice servers.
//! - [`XChaChaCipher`]: XChaCha20-Poly1305. Same nonce size and framing, but
//!   not wire-compatible with those modes; only for peers that both use it.
//!
//! ## Security
//! - Keys are 32 bytes, installed once per session
//! - Suffix-mode nonces come from the OS random source
//! - Failed authentication yields [`VoiceError::DecryptionFailure`] and no plaintext

use crate::core::mode::{EncryptionMode, NONCE_SIZE};
use crate::core::nonce::{outgoing_nonce, packet_nonce, NonceGenerator};
use crate::core::packet::{extract_ciphertext, VoicePacket};
use crate::core::rtp::{decode_header, strip_header_extension, RtpHeader};
use crate::error::{constants, Result, VoiceError};
use crate::utils::metrics::{global_metrics, Timer};
use bytes::Bytes;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use crypto_secretbox::aead::{Aead as SecretboxAead, KeyInit as SecretboxKeyInit};
use crypto_secretbox::XSalsa20Poly1305;
use tracing::debug;

/// Authenticated cipher keyed by the session's secret key
pub trait PacketCipher: Send + Sync {
    /// Encrypt `plaintext` under `nonce`, returning ciphertext with its tag
    fn seal(&self, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Verify and decrypt `ciphertext` under `nonce`
    fn open(&self, nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// XSalsa20-Poly1305 packet cipher, interoperable with libsodium secretbox
pub struct XSalsaCipher {
    cipher: XSalsa20Poly1305,
}

impl XSalsaCipher {
    /// Cipher from the 32-byte session secret key
    pub fn new(secret_key: &[u8]) -> Result<Self> {
        let cipher = <XSalsa20Poly1305 as SecretboxKeyInit>::new_from_slice(secret_key)
            .map_err(|_| VoiceError::ConfigError(constants::ERR_INVALID_KEY.to_string()))?;
        Ok(Self { cipher })
    }
}

impl PacketCipher for XSalsaCipher {
    fn seal(&self, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = crypto_secretbox::aead::Nonce::<XSalsa20Poly1305>::from_slice(nonce);
        SecretboxAead::encrypt(&self.cipher, nonce, plaintext)
            .map_err(|_| VoiceError::EncryptionFailure)
    }

    fn open(&self, nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let nonce = crypto_secretbox::aead::Nonce::<XSalsa20Poly1305>::from_slice(nonce);
        SecretboxAead::decrypt(&self.cipher, nonce, ciphertext)
            .map_err(|_| VoiceError::DecryptionFailure)
    }
}

/// XChaCha20-Poly1305 packet cipher.
///
/// Not understood by voice servers negotiating the `xsalsa20_poly1305*`
/// modes; see [`XSalsaCipher`].
pub struct XChaChaCipher {
    cipher: XChaCha20Poly1305,
}

impl XChaChaCipher {
    /// Cipher from the 32-byte session secret key
    pub fn new(secret_key: &[u8]) -> Result<Self> {
        let cipher = <XChaCha20Poly1305 as KeyInit>::new_from_slice(secret_key)
            .map_err(|_| VoiceError::ConfigError(constants::ERR_INVALID_KEY.to_string()))?;
        Ok(Self { cipher })
    }
}

impl PacketCipher for XChaChaCipher {
    fn seal(&self, nonce: &[u8; NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
        Aead::encrypt(&self.cipher, XNonce::from_slice(nonce), plaintext)
            .map_err(|_| VoiceError::EncryptionFailure)
    }

    fn open(&self, nonce: &[u8; NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
        Aead::decrypt(&self.cipher, XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| VoiceError::DecryptionFailure)
    }
}

/// Encrypt one frame into a packet, drawing its trailer from `nonces`
pub fn seal_packet<C: PacketCipher + ?Sized>(
    cipher: &C,
    header: &RtpHeader,
    plaintext: &[u8],
    nonces: &NonceGenerator,
) -> Result<VoicePacket> {
    let _timer = Timer::start("seal_packet");

    let trailer = nonces.next_trailer()?;
    let nonce = outgoing_nonce(&header.to_bytes(), &trailer, nonces.mode())?;
    let ciphertext = cipher.seal(&nonce, plaintext)?;
    global_metrics().packet_sealed();

    Ok(VoicePacket {
        header: *header,
        ciphertext: Bytes::from(ciphertext),
        trailer: Bytes::from(trailer),
    })
}

/// Decrypt a parsed packet, skipping the header extension block if present
pub fn open_packet<C: PacketCipher + ?Sized>(
    cipher: &C,
    packet: &VoicePacket,
    mode: EncryptionMode,
) -> Result<Vec<u8>> {
    let _timer = Timer::start("open_packet");

    let nonce = outgoing_nonce(&packet.header.to_bytes(), &packet.trailer, mode)?;
    open_with_nonce(cipher, &packet.header, &nonce, &packet.ciphertext)
}

/// Decrypt a raw datagram without splitting it into a [`VoicePacket`] first
pub fn open_datagram<C: PacketCipher + ?Sized>(
    cipher: &C,
    datagram: &[u8],
    mode: EncryptionMode,
) -> Result<Vec<u8>> {
    let _timer = Timer::start("open_datagram");

    let header = decode_header(datagram)?;
    let nonce = packet_nonce(datagram, mode)?;
    let ciphertext = extract_ciphertext(datagram, mode)?;
    open_with_nonce(cipher, &header, &nonce, ciphertext)
}

fn open_with_nonce<C: PacketCipher + ?Sized>(
    cipher: &C,
    header: &RtpHeader,
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    let mut plaintext = cipher.open(nonce, ciphertext).inspect_err(|_| {
        debug!(ssrc = header.ssrc, sequence = header.sequence, "{}", constants::ERR_DECRYPTION_FAILED);
        global_metrics().open_failed();
    })?;

    if header.has_extension {
        let skip = plaintext.len() - strip_header_extension(&plaintext)?.len();
        plaintext.drain(..skip);
    }

    global_metrics().packet_opened();
    Ok(plaintext)
}
