//! Benchmarks for ADSR envelope.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use unison_dsp::dsp::envelope::Envelope;

use crate::BLOCK_SIZES;

pub fn bench_envelope(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/envelope");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // Sustain stage: the steady state most voices sit in
        let mut env = Envelope::adsr(48_000.0, 0.001, 0.001, 0.7, 0.2);
        env.note_on();
        let mut warmup = vec![0.0f32; 512];
        env.render(&mut warmup);
        group.bench_with_input(BenchmarkId::new("sustain", size), &size, |b, _| {
            b.iter(|| env.render(black_box(&mut buffer)))
        });

        // Attack stage: retriggered every block
        let mut env = Envelope::adsr(48_000.0, 1.0, 0.1, 0.7, 0.2);
        group.bench_with_input(BenchmarkId::new("attack", size), &size, |b, _| {
            b.iter(|| {
                env.note_on();
                env.render(black_box(&mut buffer));
            })
        });
    }

    group.finish();
}
