//! Criterion benchmarks for the sixel encoder.
//!
//! Run with: `cargo bench -p sixel-core`

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use sixel_core::{encode, IndexedFrameBuffer, Palette};

/// A 640x400 frame of diagonal stripes: short runs, every color in every band.
fn striped_frame() -> IndexedFrameBuffer {
    let mut fb = IndexedFrameBuffer::new(640, 400).unwrap();
    for y in 0..400 {
        for x in 0..640 {
            fb.set(x, y, (((x + y) / 8) % 16) as u8);
        }
    }
    fb
}

fn bench_encode(c: &mut Criterion) {
    let palette = Palette::tic80();
    let mut group = c.benchmark_group("encode_640x400");
    group.throughput(Throughput::Elements(640 * 400));

    let mut uniform = IndexedFrameBuffer::new(640, 400).unwrap();
    uniform.fill(8);
    let mut out = Vec::with_capacity(512 * 1024);
    group.bench_function("uniform", |b| {
        b.iter(|| {
            out.clear();
            encode(&palette, black_box(&uniform), &mut out).unwrap();
        });
    });

    let striped = striped_frame();
    group.bench_function("striped", |b| {
        b.iter(|| {
            out.clear();
            encode(&palette, black_box(&striped), &mut out).unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_encode);
criterion_main!(benches);
