//! Benchmarks for fixed-point wave table lookups.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use unison_dsp::dsp::wave::{phase_increment, FixedPointWaveTable, Waveform};

use crate::BLOCK_SIZES;

pub fn bench_wave(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/wave");
    let table = FixedPointWaveTable::shared();

    group.bench_function("build_tables", |b| b.iter(FixedPointWaveTable::new));

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0i32; size];

        // A3 and A6: a wide band and a narrow one
        for (name, freq) in [("low", 220.0f32), ("high", 1760.0)] {
            let inc = phase_increment(freq / 48_000.0);
            let wave = table.buffer(Waveform::DownSaw, inc);
            let mut phase = 0u32;
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    for sample in buffer.iter_mut() {
                        phase = phase.wrapping_add(inc);
                        *sample = FixedPointWaveTable::lookup(black_box(wave), phase);
                    }
                    black_box(&buffer);
                })
            });
        }
    }

    group.finish();
}
