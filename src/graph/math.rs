use crate::{
    dsp::{clamp_finite, midi_to_freq},
    graph::{
        output::{Output, Rate},
        processor::{InputSpec, Inputs, Processor},
    },
};

/// Sample-wise product of two signals (amplitude or ring modulation).
///
/// A non-finite product is written as silence.
pub struct Multiply;

impl Multiply {
    pub const LEFT: usize = 0;
    pub const RIGHT: usize = 1;
}

impl Processor for Multiply {
    fn name(&self) -> &'static str {
        "multiply"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        const INPUTS: &[InputSpec] = &[InputSpec::fixed("left"), InputSpec::modulatable("right")];
        INPUTS
    }

    fn process(&mut self, inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        let left = inputs.get(Self::LEFT);
        let right = inputs.get(Self::RIGHT);
        let out = &mut outputs[0];
        for (i, sample) in out.buffer[..block_size].iter_mut().enumerate() {
            let product = left.at(i) * right.at(i);
            *sample = if product.is_finite() { product } else { 0.0 };
        }
    }
}

/// Lowest note the pitch converter accepts.
pub const MIN_NOTE: f32 = -128.0;
/// Highest note the pitch converter accepts.
pub const MAX_NOTE: f32 = 256.0;
/// Largest normalized phase increment handed to oscillators (Nyquist).
pub const MAX_PHASE_INCREMENT: f32 = 0.5;

/// Converts a (fractional) MIDI note plus transpose and fine tune into a
/// normalized per-sample phase increment.
///
/// `increment = freq(note + transpose + tune / 100) / sample_rate`, clamped
/// to `[0, MAX_PHASE_INCREMENT]`.
pub struct PhaseIncrement {
    sample_rate: f32,
}

impl PhaseIncrement {
    pub const NOTE: usize = 0;
    pub const TRANSPOSE: usize = 1;
    pub const TUNE: usize = 2;

    pub fn new(sample_rate: f32) -> Self {
        Self { sample_rate }
    }

    pub fn increment(&self, note: f32, transpose: f32, tune_cents: f32) -> f32 {
        let pitch = clamp_finite(note + transpose + tune_cents / 100.0, MIN_NOTE, MAX_NOTE, 0.0);
        clamp_finite(
            midi_to_freq(pitch) / self.sample_rate,
            0.0,
            MAX_PHASE_INCREMENT,
            0.0,
        )
    }
}

impl Processor for PhaseIncrement {
    fn name(&self) -> &'static str {
        "phase_increment"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        const INPUTS: &[InputSpec] = &[
            InputSpec::fixed("note"),
            InputSpec::modulatable("transpose"),
            InputSpec::modulatable("tune"),
        ];
        INPUTS
    }

    fn rate(&self) -> Rate {
        Rate::Control
    }

    fn process(&mut self, inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        let increment = self.increment(
            inputs.first(Self::NOTE),
            inputs.first(Self::TRANSPOSE),
            inputs.first(Self::TUNE),
        );
        outputs[0].fill(increment, block_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn control(value: f32) -> Output {
        let mut out = Output::control();
        out.fill(value, 1);
        out
    }

    #[test]
    fn multiply_mixes_rates() {
        let mut audio = Output::audio();
        audio.buffer[..4].copy_from_slice(&[1.0, -1.0, 0.5, 0.0]);
        let sources = [audio, control(0.5)];
        let silence = Output::control();
        let inputs = Inputs::direct(&sources, &silence);

        let mut outputs = [Output::audio()];
        Multiply.process(&inputs, &mut outputs, 4);
        assert_eq!(&outputs[0].buffer[..4], &[0.5, -0.5, 0.25, 0.0]);
    }

    #[test]
    fn a4_at_48k() {
        let pitch = PhaseIncrement::new(48_000.0);
        assert_relative_eq!(pitch.increment(69.0, 0.0, 0.0), 440.0 / 48_000.0, epsilon = 1e-6);
        assert_relative_eq!(pitch.increment(57.0, 12.0, 0.0), 440.0 / 48_000.0, epsilon = 1e-6);
        assert_relative_eq!(pitch.increment(69.0, 0.0, 1200.0), 880.0 / 48_000.0, epsilon = 1e-5);
    }

    #[test]
    fn increment_stays_below_nyquist() {
        let pitch = PhaseIncrement::new(48_000.0);
        assert_eq!(pitch.increment(1e9, 0.0, 0.0), MAX_PHASE_INCREMENT);
        assert_eq!(pitch.increment(f32::NAN, 0.0, 0.0), midi_to_freq(0.0) / 48_000.0);
        assert!(pitch.increment(-1e9, 0.0, 0.0) >= 0.0);
    }
}
