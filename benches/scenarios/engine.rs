//! Benchmarks for the polyphonic engine.
//!
//! These run the complete voice patch: two unison slots, filter,
//! envelopes and LFO, with modulation routed through the graph.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use unison_dsp::{EngineConfig, ModulationConnection, SynthEngine};

use crate::BLOCK_SIZES;

fn engine(unison: f32) -> SynthEngine {
    let mut engine = SynthEngine::new(EngineConfig::default().with_polyphony(8))
        .expect("default config is valid");
    engine.set_parameter("osc_1_unison_voices", unison).unwrap();
    engine.set_parameter("osc_2_unison_voices", unison).unwrap();
    engine
        .connect_modulation(&ModulationConnection::new("lfo_1", "filter_cutoff", 12.0))
        .unwrap();
    engine
        .connect_modulation(&ModulationConnection::new("mod_envelope", "cross_modulation", 0.2))
        .unwrap();
    engine
}

pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/engine");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        // === SINGLE NOTE ===
        // baseline cost of one voice graph
        let mut single = engine(1.0);
        single.note_on(57, 100, 0);
        group.bench_with_input(BenchmarkId::new("single_note", size), &size, |b, _| {
            b.iter(|| single.process(black_box(&mut buffer)))
        });

        // === SUPERSAW CHORD ===
        // four notes, seven voices per slot
        let mut chord = engine(7.0);
        for note in [48, 55, 60, 64] {
            chord.note_on(note, 100, 0);
        }
        group.bench_with_input(BenchmarkId::new("supersaw_chord", size), &size, |b, _| {
            b.iter(|| chord.process(black_box(&mut buffer)))
        });

        // === FULL POLYPHONY ===
        // every voice busy at the maximum unison count
        let mut full = engine(15.0);
        for note in 60..68 {
            full.note_on(note, 100, 0);
        }
        group.bench_with_input(BenchmarkId::new("full_polyphony", size), &size, |b, _| {
            b.iter(|| full.process(black_box(&mut buffer)))
        });
    }

    group.finish();
}
