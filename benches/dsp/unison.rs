//! Benchmarks for the unison oscillator bank.
//!
//! Cost should scale roughly linearly with the voice count per slot.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use unison_dsp::graph::{
    oscillators::UnisonOscillatorBank as Bank, Inputs, Output, Processor,
};

use crate::BLOCK_SIZES;

fn sources(voices: f32) -> Vec<Output> {
    let mut sources: Vec<Output> = (0..12).map(|_| Output::control()).collect();
    for (inc, waveform, count, detune) in [
        (Bank::OSC_1_PHASE_INC, Bank::OSC_1_WAVEFORM, Bank::OSC_1_VOICES, Bank::OSC_1_DETUNE),
        (Bank::OSC_2_PHASE_INC, Bank::OSC_2_WAVEFORM, Bank::OSC_2_VOICES, Bank::OSC_2_DETUNE),
    ] {
        sources[inc].fill(220.0 / 48_000.0, 1);
        sources[waveform].fill(3.0, 1);
        sources[count].fill(voices, 1);
        sources[detune].fill(20.0, 1);
    }
    sources
}

pub fn bench_unison(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/unison");
    let silence = Output::control();

    for &size in BLOCK_SIZES {
        for voices in [1usize, 4, 8, 15] {
            let sources = sources(voices as f32);
            let mut bank = Bank::new(1);
            let mut outputs = vec![Output::audio(), Output::audio(), Output::audio()];
            group.bench_with_input(
                BenchmarkId::new(format!("voices_{voices}"), size),
                &size,
                |b, &size| {
                    b.iter(|| {
                        let inputs = Inputs::direct(&sources, &silence);
                        bank.process(&inputs, black_box(&mut outputs), size);
                    })
                },
            );
        }
    }

    group.finish();
}
