//! Unison voice math: detune spread, harmonize offsets, gain and pitch drift.

use rand::Rng;

use crate::{
    dsp::control_index,
    MAX_UNISON,
};

/*
Unison
======

Unison plays several copies ("voices") of one oscillator at once, each
slightly detuned, so the beating between them thickens the sound.

Spreading the Voices
--------------------

Voice 0 is the center voice and always plays the base pitch. The others are
paired off and pushed symmetrically above and below it:

    voice:      0     1     2     3     4     5     6
    pair:       0     1     1     2     2     3     3
    direction:  .     -     +     -     +     -     +

The detune of a voice (in cents) grows with its pair number and is normalized
by (voices + 1) / 2, so with an even voice count the outermost pair sits at
the full detune amount:

    amount(v)   = detune * ((v + 1) / 2) / ((voices + 1) / 2)     (integer halves)
    exponent(v) = ±amount(v) / 1200                                (octaves)
    ratio(v)    = harmonic(v) + 2^exponent(v) + amount(v) * drift(v)

`harmonic(v)` is `v` in harmonize mode and 0 otherwise, which moves voice v
up to roughly the (v + 1)th harmonic of the base pitch.

Loudness
--------

Summing N voices would make the sound N times louder. Uncorrelated voices
only add up to about sqrt(N) on average, so the engine divides by a cheaper
integer curve, (N / 2) + 1, which keeps the perceived level roughly steady:

    voices:  1    2    3    4    5  ...  15
    gain:    1   1/2  1/2  1/3  1/3 ... 1/8

Drift
-----

Analog oscillators never hold perfectly still. Once per block every voice's
random offset takes a tiny random step and is then pulled back toward zero:

    offset = (offset + step) * DRIFT_DECAY

With step uniform in [-DRIFT_RATIO/2, DRIFT_RATIO/2) the offset can never
exceed DRIFT_RATIO / 2 / (1 - DRIFT_DECAY) in magnitude, so the wander is
bounded and slow rather than white noise.
*/

/// Cents in one octave.
pub const CENTS_PER_OCTAVE: f64 = 1200.0;
/// Largest accepted unison detune in cents.
pub const MAX_DETUNE_CENTS: f32 = 100.0;
/// Per-block pull of the drift offsets toward zero.
pub const DRIFT_DECAY: f64 = 0.999;
/// Width of one random drift step.
pub const DRIFT_RATIO: f64 = 0.00001;
const DRIFT_RESOLUTION: u32 = 10_000;

/// Largest magnitude a drift offset can reach.
pub const MAX_DRIFT: f64 = DRIFT_RATIO / 2.0 / (1.0 - DRIFT_DECAY);

/// Active voice count from a raw control value, clamped to `[1, MAX_UNISON]`.
#[inline]
pub fn unison_voices(control: f32) -> usize {
    control_index(control, 1, MAX_UNISON as i32) as usize
}

/// Detune in cents from a raw control value, clamped to `[0, MAX_DETUNE_CENTS]`.
/// NaN means no detune.
#[inline]
pub fn unison_detune(control: f32) -> f64 {
    if control.is_nan() {
        return 0.0;
    }
    control.clamp(0.0, MAX_DETUNE_CENTS) as f64
}

/// Harmonize switch from a raw control value: any non-zero value is on, NaN is off.
#[inline]
pub fn harmonize_enabled(control: f32) -> bool {
    control != 0.0 && !control.is_nan()
}

/// Gain applied to the sum of `voices` unison voices.
#[inline]
pub fn unison_gain(voices: usize) -> f32 {
    1.0 / ((voices >> 1) + 1) as f32
}

/// Detune of `voice` in cents before its direction is applied.
#[inline]
pub fn detune_amount(voice: usize, voices: usize, detune: f64) -> f64 {
    let pairs = ((voices + 1) / 2).max(1);
    detune * ((voice + 1) / 2) as f64 / pairs as f64
}

/// Octave exponent of `voice`. Odd voices detune down, even voices up.
#[inline]
pub fn detune_exponent(voice: usize, voices: usize, detune: f64) -> f64 {
    let exponent = detune_amount(voice, voices, detune) / CENTS_PER_OCTAVE;
    if voice % 2 == 1 {
        -exponent
    } else {
        exponent
    }
}

/// Additive harmonic term of `voice`'s ratio.
#[inline]
pub fn harmonic_offset(voice: usize, harmonize: bool) -> f64 {
    if harmonize {
        voice as f64
    } else {
        0.0
    }
}

/// Multiplier applied to the base phase increment for `voice`.
#[inline]
pub fn detune_ratio(
    voice: usize,
    voices: usize,
    detune: f64,
    harmonize: bool,
    drift: f64,
) -> f64 {
    let amount = detune_amount(voice, voices, detune);
    harmonic_offset(voice, harmonize)
        + 2.0_f64.powf(detune_exponent(voice, voices, detune))
        + amount * drift
}

/// Scale a fixed-point increment, wrapping modulo one cycle.
#[inline]
pub fn scale_increment(base: u32, ratio: f64) -> u32 {
    // f64 -> u64 saturates (negative and NaN become 0); the u32 cast wraps.
    (base as f64 * ratio) as u64 as u32
}

/// Slowly wandering per-voice pitch offsets.
#[derive(Debug, Clone)]
pub struct PitchDrift {
    offsets: [f64; MAX_UNISON],
}

impl PitchDrift {
    pub fn new() -> Self {
        Self {
            offsets: [0.0; MAX_UNISON],
        }
    }

    /// Advance every voice's offset by one random step, then decay it.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for offset in self.offsets.iter_mut() {
            *offset += random_pitch_change(rng);
            *offset *= DRIFT_DECAY;
        }
    }

    /// Zero every offset.
    pub fn clear(&mut self) {
        self.offsets = [0.0; MAX_UNISON];
    }

    #[inline]
    pub fn offset(&self, voice: usize) -> f64 {
        self.offsets[voice]
    }

    pub fn offsets(&self) -> &[f64; MAX_UNISON] {
        &self.offsets
    }
}

impl Default for PitchDrift {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn random_pitch_change<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let step = rng.gen_range(0..DRIFT_RESOLUTION);
    DRIFT_RATIO * step as f64 / DRIFT_RESOLUTION as f64 - DRIFT_RATIO / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn voice_zero_is_centered() {
        for voices in 1..=MAX_UNISON {
            assert_eq!(detune_exponent(0, voices, 50.0), 0.0);
            assert_eq!(detune_ratio(0, voices, 50.0, false, 0.0), 1.0);
        }
    }

    #[test]
    fn adjacent_voices_mirror_each_other() {
        for voices in 1..=MAX_UNISON {
            for detune in [0.0, 3.5, 25.0, 100.0] {
                for pair in 1..=(MAX_UNISON - 1) / 2 {
                    let down = detune_exponent(2 * pair - 1, voices, detune);
                    let up = detune_exponent(2 * pair, voices, detune);
                    assert_eq!(down, -up, "voices {voices} detune {detune} pair {pair}");
                    assert!(down <= 0.0);
                }
            }
        }
    }

    #[test]
    fn detune_amount_scales_with_pair() {
        assert_relative_eq!(detune_amount(1, 2, 30.0), 30.0);
        assert_relative_eq!(detune_amount(2, 3, 30.0), 15.0);
        assert_relative_eq!(detune_amount(1, 5, 30.0), 10.0);
        assert_relative_eq!(detune_amount(4, 5, 30.0), 20.0);
        assert_relative_eq!(detune_amount(5, 6, 30.0), 30.0);
        assert_relative_eq!(detune_amount(6, 7, 30.0), 22.5);
    }

    #[test]
    fn harmonize_adds_voice_index() {
        for voice in 0..MAX_UNISON {
            assert_eq!(harmonic_offset(voice, true), voice as f64);
            assert_eq!(harmonic_offset(voice, false), 0.0);

            let plain = detune_ratio(voice, 7, 12.0, false, 0.002);
            let harmonized = detune_ratio(voice, 7, 12.0, true, 0.002);
            assert_relative_eq!(harmonized - plain, voice as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn unison_gain_steps_by_pairs() {
        assert_eq!(unison_gain(1), 1.0);
        assert_eq!(unison_gain(2), 0.5);
        assert_eq!(unison_gain(3), 0.5);
        assert_eq!(unison_gain(4), 1.0 / 3.0);
        assert_eq!(unison_gain(15), 1.0 / 8.0);
    }

    #[test]
    fn control_values_clamp() {
        assert_eq!(unison_voices(0.0), 1);
        assert_eq!(unison_voices(-3.0), 1);
        assert_eq!(unison_voices(99.0), MAX_UNISON);
        assert_eq!(unison_voices(f32::NAN), 1);
        assert_eq!(unison_voices(1e30), MAX_UNISON);
        assert_eq!(unison_voices(f32::INFINITY), MAX_UNISON);
        assert_eq!(unison_voices(f32::NEG_INFINITY), 1);
        assert_eq!(unison_detune(-10.0), 0.0);
        assert_eq!(unison_detune(f32::NAN), 0.0);
        assert_eq!(unison_detune(f32::INFINITY), MAX_DETUNE_CENTS as f64);
        assert_eq!(unison_detune(f32::NEG_INFINITY), 0.0);
        assert_eq!(unison_detune(1e9), MAX_DETUNE_CENTS as f64);
    }

    #[test]
    fn harmonize_is_on_for_any_nonzero_value() {
        assert!(!harmonize_enabled(0.0));
        assert!(!harmonize_enabled(-0.0));
        assert!(!harmonize_enabled(f32::NAN));
        assert!(harmonize_enabled(0.25));
        assert!(harmonize_enabled(1.0));
        assert!(harmonize_enabled(-1.0));
        assert!(harmonize_enabled(f32::INFINITY));
    }

    #[test]
    fn scale_increment_wraps() {
        assert_eq!(scale_increment(1_000, 2.0), 2_000);
        assert_eq!(scale_increment(u32::MAX / 2 + 1, 2.0), 0);
        assert_eq!(scale_increment(1_000, -1.0), 0);
    }

    #[test]
    fn drift_stays_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut drift = PitchDrift::new();
        for _ in 0..50_000 {
            drift.step(&mut rng);
        }
        for &offset in drift.offsets() {
            assert!(offset.abs() <= MAX_DRIFT, "offset {offset}");
        }
        assert!(drift.offsets().iter().any(|&o| o != 0.0));
        drift.clear();
        assert!(drift.offsets().iter().all(|&o| o == 0.0));
    }

    #[test]
    fn drift_is_seeded() {
        let mut a = PitchDrift::new();
        let mut b = PitchDrift::new();
        let mut rng_a = StdRng::seed_from_u64(42);
        let mut rng_b = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            a.step(&mut rng_a);
            b.step(&mut rng_b);
        }
        assert_eq!(a.offsets(), b.offsets());
    }
}
