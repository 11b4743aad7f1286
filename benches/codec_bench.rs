//! Wire codec throughput benchmarks.
//!
//! The codec runs on every received byte burst and every transmitted
//! command; a poll loop at 50 Hz leaves it a generous budget, but it
//! should stay far below that.

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use gdolink_core::ClientId;
use gdolink_protocol::{Command, FrameAccumulator, payload, wire};

fn bench_encode(c: &mut Criterion) {
    let client = ClientId::default();

    c.bench_function("encode_status_query", |b| {
        let mut rolling = 0u32;
        b.iter(|| {
            rolling = rolling.wrapping_add(1);
            black_box(wire::encode(
                Command::GetStatus,
                0,
                black_box(rolling),
                client,
            ))
        });
    });

    c.bench_function("encode_ttc_set", |b| {
        b.iter(|| {
            black_box(wire::encode(
                Command::TtcSetDuration,
                payload::u16_pair(black_box(300)),
                12345,
                client,
            ))
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let client = ClientId::default();
    let packet = wire::encode(Command::Status, 0x0201, 987654, client);

    c.bench_function("decode_status_report", |b| {
        b.iter(|| black_box(wire::decode(black_box(&packet)).unwrap()));
    });

    c.bench_function("accumulate_and_decode", |b| {
        let mut noisy = vec![0xffu8; 7];
        noisy.extend_from_slice(packet.as_bytes());
        b.iter(|| {
            let mut accumulator = FrameAccumulator::new();
            accumulator.feed(black_box(&noisy));
            let frame = accumulator.next_frame().unwrap();
            black_box(wire::decode(&frame).unwrap())
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
