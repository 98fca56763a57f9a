use bytes::{Bytes, BytesMut};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use voice_link::core::mode::EncryptionMode;
use voice_link::core::packet::{extract_ciphertext, write_packet, VoicePacket};
use voice_link::core::rtp::{decode_header, encode_header, RtpHeader, HEADER_SIZE};

#[allow(clippy::unwrap_used)]
fn bench_header(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtp_header");

    group.bench_function("encode", |b| {
        let mut buf = [0u8; HEADER_SIZE];
        b.iter(|| encode_header(4242, 960_000, 0xCAFE_BABE, &mut buf).unwrap())
    });

    let bytes = RtpHeader::new(4242, 960_000, 0xCAFE_BABE).to_bytes();
    group.bench_function("decode", |b| b.iter(|| decode_header(&bytes).unwrap()));

    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_packet_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_framing");
    let ciphertext_sizes = [40usize, 160, 1200];

    for mode in EncryptionMode::PREFERENCE {
        let trailer = vec![0u8; mode.trailer_size()];

        for &size in &ciphertext_sizes {
            let ciphertext = vec![0xAB; size];
            let mut wire = BytesMut::new();
            write_packet(&RtpHeader::new(1, 2, 3), &ciphertext, &trailer, mode, &mut wire).unwrap();
            let wire: Bytes = wire.freeze();

            group.throughput(Throughput::Bytes(wire.len() as u64));
            group.bench_function(format!("write_{mode}_{size}b"), |b| {
                b.iter_batched(
                    || BytesMut::with_capacity(wire.len()),
                    |mut buf| {
                        write_packet(&RtpHeader::new(1, 2, 3), &ciphertext, &trailer, mode, &mut buf)
                            .unwrap();
                        buf
                    },
                    BatchSize::SmallInput,
                )
            });
            group.bench_function(format!("extract_{mode}_{size}b"), |b| {
                b.iter(|| extract_ciphertext(&wire, mode).unwrap().len())
            });
            group.bench_function(format!("parse_{mode}_{size}b"), |b| {
                b.iter(|| VoicePacket::parse(wire.clone(), mode).unwrap())
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_header, bench_packet_framing);
criterion_main!(benches);
