//! Benchmarks for state-variable filter.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use unison_dsp::dsp::filter::{FilterType, SVFilter};

use crate::BLOCK_SIZES;

const SAMPLE_RATE: f32 = 48_000.0;

pub fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/filter");

    for &size in BLOCK_SIZES {
        // Generate a test signal (sawtooth-like ramp)
        let input: Vec<f32> = (0..size)
            .map(|i| (i as f32 / size as f32) * 2.0 - 1.0)
            .collect();

        for filter_type in [
            FilterType::LowPass,
            FilterType::BandPass,
            FilterType::HighShelf,
            FilterType::BandShelf,
        ] {
            let mut filter = SVFilter::new(filter_type);
            filter.set_cutoff(1000.0);
            filter.set_q(2.0);
            filter.set_gain_db(6.0);
            let mut buffer = input.clone();
            let name = format!("{filter_type:?}").to_lowercase();
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| {
                    buffer.copy_from_slice(&input);
                    filter.render(black_box(&mut buffer), black_box(SAMPLE_RATE));
                })
            });
        }
    }

    group.finish();
}
