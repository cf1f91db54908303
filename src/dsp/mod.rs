//! Low-level DSP primitives used by the graph processors.
//!
//! These components are allocation-free and realtime-safe once constructed,
//! making them safe to embed directly inside processors. They stay focused on
//! the signal-processing math so the graph layer can handle routing and
//! modulation.

/// Attack/decay/sustain/release envelope generator.
pub mod envelope;
/// State-variable filter with peaking and shelving responses.
pub mod filter;
/// Detune ratios, unison gain and analog-style pitch drift.
pub mod unison;
/// Band-limited fixed-point wave tables.
pub mod wave;

pub use envelope::EnvelopeState;
pub use filter::FilterType;
pub use wave::{FixedPointWaveTable, Waveform};

/// Replace NaN/Inf with `fallback`, otherwise clamp into `[min, max]`.
///
/// `f32::clamp` propagates NaN, which is exactly what a corrupted control
/// value must never do downstream.
#[inline]
pub fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

/// Round a control value to the nearest integer and clamp it into `[min, max]`.
///
/// NaN maps to `min`; infinities saturate to the matching end.
#[inline]
pub fn control_index(value: f32, min: i32, max: i32) -> i32 {
    if value.is_nan() {
        return min;
    }
    // `as` saturates, so huge values land on i32::MAX before the clamp.
    ((value + 0.5).floor() as i32).clamp(min, max)
}

/// Convert a MIDI note number (fractional allowed) to frequency in Hz.
/// A4 = 440 Hz = MIDI note 69
#[inline]
pub fn midi_to_freq(note: f32) -> f32 {
    440.0 * 2.0_f32.powf((note - 69.0) / 12.0)
}
