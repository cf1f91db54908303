use std::sync::OnceLock;

use rand::{rngs::StdRng, Rng, SeedableRng};
use rustfft::{num_complex::Complex, FftPlanner};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
Fixed-Point Wave Tables
=======================

The unison oscillator bank can run up to 2 x 15 voices per note, so its inner
loop has to be cheap. Instead of evaluating waveforms in floating point, every
voice keeps a 32-bit integer phase and reads a precomputed integer table.

Vocabulary
----------

  phase         A u32 counter. 0 is the start of a cycle and the wraparound
                at 2^32 is the end, so "phase mod one cycle" is free.

  increment     How far the phase moves per sample. A normalized frequency
                f/sr in [0, 1) maps to increment = f/sr * 2^32.

  band          One band-limited copy of a waveform. Band b keeps harmonics
                1..=2^b and drops everything above.

  fixed point   Table entries are i32 values equal to sample * SCALE * i32::MAX.
                SCALE leaves headroom for the overshoot that band-limiting
                introduces near discontinuities.


Why Bands?
----------

A naive sawtooth has harmonics at every multiple of its fundamental. Played
at 5 kHz with a 48 kHz sample rate, harmonics 5 and above sit beyond Nyquist
(24 kHz) and fold back into the audible range as inharmonic junk (aliasing).

The table therefore holds NUM_BANDS copies of every waveform:

    band 0:  1 harmonic      (a sine, safe up to Nyquist)
    band 1:  2 harmonics
    band 2:  4 harmonics
    ...
    band 9:  512 harmonics   (used for low notes)

A voice picks the band from its phase increment. Nyquist sits at an increment
of 2^31, so the number of harmonics that fit is 2^31 / increment, and we take
the largest band that does not exceed it.


Building the Tables
-------------------

Each waveform is first sampled naively at OVERSAMPLE times the table length.
A forward FFT gives its harmonic spectrum; for each band we copy harmonics
1..=limit into a table-sized spectrum and inverse-transform it. DC is dropped,
so every table is centered on zero.

Lookups interpolate linearly between neighbouring entries using the low
FRACTIONAL_BITS bits of the phase. Each table stores one guard entry past the
end (a copy of entry 0) so the interpolation never needs to wrap.
*/

/// Number of bits of phase used to index a table.
pub const LOOKUP_BITS: u32 = 11;
/// Entries per table (excluding the guard entry).
pub const LOOKUP_SIZE: usize = 1 << LOOKUP_BITS;
/// Phase bits below the table index, used for interpolation.
pub const FRACTIONAL_BITS: u32 = 32 - LOOKUP_BITS;
const FRACTIONAL_MASK: u32 = (1 << FRACTIONAL_BITS) - 1;

/// Band-limited copies kept per waveform.
pub const NUM_BANDS: usize = 10;
/// Harmonics kept by the widest band.
pub const MAX_HARMONICS: usize = 1 << (NUM_BANDS - 1);

/// Fraction of the i32 range a full-scale sample occupies.
pub const SCALE: f64 = 0.5;

/// Converts the summed fixed-point output of both oscillator slots to a
/// normalized float. The leading 0.5 averages the two slots.
pub const SCALE_OUT: f32 = (0.5 / (SCALE * i32::MAX as f64)) as f32;

/// Converts one fixed-point table value back to a normalized float.
pub const SCALE_NORMALIZE: f32 = (1.0 / (SCALE * i32::MAX as f64)) as f32;

const OVERSAMPLE: usize = 8;
const NOISE_SEED: u64 = 0x6e6f_6973_65;

/// Waveforms held by the table, in control-index order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    DownSaw,
    UpSaw,
    ThreeStep,
    FourStep,
    EightStep,
    ThreePyramid,
    FivePyramid,
    NinePyramid,
    /// Reserved: present in the table but never chosen by the oscillator bank.
    WhiteNoise,
}

impl Waveform {
    pub const ALL: [Waveform; 12] = [
        Waveform::Sine,
        Waveform::Triangle,
        Waveform::Square,
        Waveform::DownSaw,
        Waveform::UpSaw,
        Waveform::ThreeStep,
        Waveform::FourStep,
        Waveform::EightStep,
        Waveform::ThreePyramid,
        Waveform::FivePyramid,
        Waveform::NinePyramid,
        Waveform::WhiteNoise,
    ];

    /// Number of waveforms an oscillator may select (everything before noise).
    pub const SELECTABLE: usize = Waveform::WhiteNoise as usize;

    /// Round a raw control value to the nearest selectable waveform.
    ///
    /// Out-of-range and non-finite values clamp into the selectable range,
    /// which never includes [`Waveform::WhiteNoise`].
    pub fn from_control(value: f32) -> Self {
        let index = super::control_index(value, 0, Self::SELECTABLE as i32 - 1);
        Self::ALL[index as usize]
    }

    /// Naive (aliasing) waveform value at `t` in `[0, 1)`.
    fn naive(self, t: f64) -> f64 {
        use std::f64::consts::TAU;

        match self {
            Waveform::Sine => (TAU * t).sin(),
            Waveform::Triangle => {
                if t < 0.25 {
                    4.0 * t
                } else if t < 0.75 {
                    2.0 - 4.0 * t
                } else {
                    4.0 * t - 4.0
                }
            }
            Waveform::Square => {
                if t < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::DownSaw => 1.0 - 2.0 * t,
            Waveform::UpSaw => 2.0 * t - 1.0,
            Waveform::ThreeStep => staircase(t, 3),
            Waveform::FourStep => staircase(t, 4),
            Waveform::EightStep => staircase(t, 8),
            Waveform::ThreePyramid => pyramid(t, 3),
            Waveform::FivePyramid => pyramid(t, 5),
            Waveform::NinePyramid => pyramid(t, 9),
            Waveform::WhiteNoise => 0.0,
        }
    }
}

/// Rising staircase with `levels` evenly spaced steps from -1 to 1.
fn staircase(t: f64, levels: usize) -> f64 {
    let step = ((t * levels as f64).floor() as usize).min(levels - 1);
    2.0 * step as f64 / (levels - 1) as f64 - 1.0
}

/// Staircase that climbs through `levels` steps and back down again.
fn pyramid(t: f64, levels: usize) -> f64 {
    let steps = 2 * (levels - 1);
    let step = ((t * steps as f64).floor() as usize).min(steps - 1);
    let level = if step < levels { step } else { steps - step };
    2.0 * level as f64 / (levels - 1) as f64 - 1.0
}

#[inline]
fn to_fixed(sample: f64) -> i32 {
    (sample * SCALE * i32::MAX as f64)
        .round()
        .clamp(i32::MIN as f64, i32::MAX as f64) as i32
}

/// Precomputed band-limited tables for every [`Waveform`].
///
/// Immutable after construction; one instance is shared by every oscillator
/// through [`FixedPointWaveTable::shared`].
pub struct FixedPointWaveTable {
    // Indexed by waveform * NUM_BANDS + band, each LOOKUP_SIZE + 1 long.
    tables: Vec<Box<[i32]>>,
}

impl FixedPointWaveTable {
    /// Build every table. Allocates and runs FFTs; never call from the audio thread.
    pub fn new() -> Self {
        let oversampled = LOOKUP_SIZE * OVERSAMPLE;
        let mut planner = FftPlanner::<f64>::new();
        let forward = planner.plan_fft_forward(oversampled);
        let inverse = planner.plan_fft_inverse(LOOKUP_SIZE);

        let mut tables = Vec::with_capacity(Waveform::ALL.len() * NUM_BANDS);

        for waveform in Waveform::ALL {
            if waveform == Waveform::WhiteNoise {
                let noise = noise_table();
                for _ in 0..NUM_BANDS {
                    tables.push(noise.clone());
                }
                continue;
            }

            let mut spectrum: Vec<Complex<f64>> = (0..oversampled)
                .map(|i| Complex::new(waveform.naive(i as f64 / oversampled as f64), 0.0))
                .collect();
            forward.process(&mut spectrum);

            let norm = 1.0 / oversampled as f64;
            for band in 0..NUM_BANDS {
                let limit = (1usize << band).min(LOOKUP_SIZE / 2 - 1);
                let mut bins = vec![Complex::new(0.0, 0.0); LOOKUP_SIZE];
                for harmonic in 1..=limit {
                    bins[harmonic] = spectrum[harmonic] * norm;
                    bins[LOOKUP_SIZE - harmonic] = spectrum[oversampled - harmonic] * norm;
                }
                inverse.process(&mut bins);

                let mut table: Vec<i32> = bins.iter().map(|c| to_fixed(c.re)).collect();
                table.push(table[0]);
                tables.push(table.into_boxed_slice());
            }
        }

        Self { tables }
    }

    /// Process-wide instance, built on first use.
    pub fn shared() -> &'static FixedPointWaveTable {
        static TABLE: OnceLock<FixedPointWaveTable> = OnceLock::new();
        TABLE.get_or_init(FixedPointWaveTable::new)
    }

    /// Band index whose harmonics stay below Nyquist for `phase_inc`.
    #[inline]
    pub fn band_for(phase_inc: u32) -> usize {
        if phase_inc == 0 {
            return NUM_BANDS - 1;
        }
        let harmonics = (1u64 << 31) / phase_inc as u64;
        if harmonics == 0 {
            return 0;
        }
        let band = (63 - harmonics.leading_zeros()) as usize;
        band.min(NUM_BANDS - 1)
    }

    /// Table for `waveform` that is safe to play at `phase_inc`.
    #[inline]
    pub fn buffer(&self, waveform: Waveform, phase_inc: u32) -> &[i32] {
        self.band(waveform, Self::band_for(phase_inc))
    }

    /// Table for `waveform` at an explicit band (clamped to the last band).
    #[inline]
    pub fn band(&self, waveform: Waveform, band: usize) -> &[i32] {
        let band = band.min(NUM_BANDS - 1);
        &self.tables[waveform as usize * NUM_BANDS + band]
    }

    /// Linearly interpolated table value at `phase`.
    #[inline]
    pub fn lookup(buffer: &[i32], phase: u32) -> i32 {
        let index = (phase >> FRACTIONAL_BITS) as usize;
        let frac = (phase & FRACTIONAL_MASK) as i64;
        let a = buffer[index] as i64;
        let b = buffer[index + 1] as i64;
        (a + (((b - a) * frac) >> FRACTIONAL_BITS)) as i32
    }
}

impl Default for FixedPointWaveTable {
    fn default() -> Self {
        Self::new()
    }
}

fn noise_table() -> Box<[i32]> {
    let mut rng = StdRng::seed_from_u64(NOISE_SEED);
    let mut table: Vec<i32> = (0..LOOKUP_SIZE)
        .map(|_| to_fixed(rng.gen_range(-1.0..1.0)))
        .collect();
    table.push(table[0]);
    table.into_boxed_slice()
}

/// Normalized frequency (cycles per sample) to a fixed-point phase increment.
///
/// Input is clamped to `[0, 1]`; NaN maps to zero.
#[inline]
pub fn phase_increment(normalized: f32) -> u32 {
    let normalized = super::clamp_finite(normalized, 0.0, 1.0, 0.0);
    (normalized as f64 * u32::MAX as f64) as u32
}
