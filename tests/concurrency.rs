#![allow(clippy::unwrap_used, clippy::expect_used)]

use bytes::BytesMut;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::codec::{Decoder, Encoder};
use voice_link::core::mode::EncryptionMode;
use voice_link::core::packet::VoicePacket;
use voice_link::core::rtp::RtpHeader;
use voice_link::{ConcurrencyGate, VoicePacketCodec};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_encode_decode_heavy() {
    let iterations = 20_000usize;

    let mut tasks = JoinSet::new();
    for mode in EncryptionMode::PREFERENCE {
        for &size in &[0usize, 40, 160, 1200] {
            tasks.spawn(async move {
                let mut codec = VoicePacketCodec::new(mode);
                let mut buf = BytesMut::new();
                let mut header = RtpHeader::new(0, 0, size as u32);
                for i in 0..iterations {
                    let packet = VoicePacket {
                        header,
                        ciphertext: vec![(i & 0xFF) as u8; size].into(),
                        trailer: vec![0u8; mode.trailer_size()].into(),
                    };
                    codec.encode(packet.clone(), &mut buf).unwrap();
                    let decoded = codec.decode(&mut buf).unwrap();
                    assert_eq!(decoded, Some(packet));
                    assert!(buf.is_empty());
                    header = header.advance(960);
                }
            });
        }
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_gate_never_over_credits() {
    let capacity = 3;
    let gate = Arc::new(
        ConcurrencyGate::with_default_hold(1, capacity, Duration::from_millis(50)).unwrap(),
    );
    let done = Arc::new(AtomicBool::new(false));

    // Spurious and racing extends from an unrelated caller
    let extender = {
        let gate = Arc::clone(&gate);
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            while !done.load(Ordering::Relaxed) {
                gate.extend_release(Duration::from_millis(1));
                assert!(gate.available() <= capacity);
                tokio::task::yield_now().await;
            }
        })
    };

    let mut tasks = JoinSet::new();
    for n in 0..60u64 {
        let gate = Arc::clone(&gate);
        tasks.spawn(async move {
            let id = gate.acquire().await.unwrap();
            assert!(gate.available() <= capacity);
            if n % 2 == 0 {
                gate.extend_hold(id, Duration::from_millis(2));
            }
        });
    }
    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    done.store(true, Ordering::Relaxed);
    extender.await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while gate.outstanding() > 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("every hold should expire");

    assert_eq!(gate.available(), capacity);
    let snapshot = gate.metrics().snapshot();
    assert_eq!(snapshot.gate_acquisitions, 60);
    assert_eq!(snapshot.auto_releases + snapshot.custom_releases, 60);
}
