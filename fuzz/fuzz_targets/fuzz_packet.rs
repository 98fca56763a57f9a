#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use voice_link::core::mode::EncryptionMode;
use voice_link::core::nonce::packet_nonce;
use voice_link::core::packet::{extract_ciphertext, VoicePacket};
use voice_link::core::rtp::{decode_header, is_rtp_header, strip_header_extension};

fuzz_target!(|data: &[u8]| {
    // Header parsing must agree with the cheap discriminator and never panic
    assert_eq!(decode_header(data).is_ok(), is_rtp_header(data));
    let _ = strip_header_extension(data);

    for mode in EncryptionMode::PREFERENCE {
        let _ = extract_ciphertext(data, mode);
        let _ = packet_nonce(data, mode);
        let _ = VoicePacket::parse(Bytes::copy_from_slice(data), mode);
    }
});
