use crate::{
    dsp::{
        clamp_finite,
        wave::{FixedPointWaveTable, Waveform, NUM_BANDS, SCALE_NORMALIZE},
    },
    graph::{
        output::{Output, Rate},
        processor::{InputSpec, Inputs, Processor},
    },
};

/*
LFO (Low Frequency Oscillator)
==============================

A control-rate oscillator for moving parameters over time. It reads the same
fixed-point tables as the audio oscillators (the widest band, since a few Hz
never comes near Nyquist) and publishes one value per block.

  frequency   Hz, clamped to [0, MAX_LFO_HZ]
  waveform    same index space as the oscillators (noise excluded)
  retrigger   when triggered, the phase restarts at zero (note-on sync)

Output is bipolar, [-1, 1]. Because the value is sampled once per block the
effective resolution is sample_rate / block_size updates per second, which is
plenty for vibrato and sweeps.
*/

pub const MAX_LFO_HZ: f32 = 100.0;

pub struct Lfo {
    table: &'static FixedPointWaveTable,
    sample_rate: f32,
    phase: u32,
}

impl Lfo {
    pub const FREQUENCY: usize = 0;
    pub const WAVEFORM: usize = 1;
    pub const RETRIGGER: usize = 2;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            table: FixedPointWaveTable::shared(),
            sample_rate,
            phase: 0,
        }
    }
}

impl Processor for Lfo {
    fn name(&self) -> &'static str {
        "lfo"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        const INPUTS: &[InputSpec] = &[
            InputSpec::modulatable("frequency"),
            InputSpec::fixed("waveform"),
            InputSpec::fixed("retrigger"),
        ];
        INPUTS
    }

    fn rate(&self) -> Rate {
        Rate::Control
    }

    fn process(&mut self, inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        if inputs.get(Self::RETRIGGER).triggered() {
            self.phase = 0;
        }

        let waveform = Waveform::from_control(inputs.first(Self::WAVEFORM));
        let buffer = self.table.band(waveform, NUM_BANDS - 1);
        let value = FixedPointWaveTable::lookup(buffer, self.phase) as f32 * SCALE_NORMALIZE;
        outputs[0].fill(value, block_size);

        let frequency = clamp_finite(inputs.first(Self::FREQUENCY), 0.0, MAX_LFO_HZ, 0.0);
        let cycles = frequency as f64 * block_size as f64 / self.sample_rate as f64;
        let advance = (cycles.fract() * u32::MAX as f64) as u32;
        self.phase = self.phase.wrapping_add(advance);
    }

    fn reset(&mut self) {
        self.phase = 0;
    }
}
