use crate::error::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Most voices a single engine will allocate.
pub const MAX_POLYPHONY: usize = 64;
/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 0x756e_6973_6f6e;

/// Construction-time settings for a [`SynthEngine`](crate::synth::SynthEngine).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Number of voices that can sound at once.
    pub polyphony: usize,
    /// Seeds every random generator in the engine (reset phases, drift).
    pub seed: u64,
}

impl EngineConfig {
    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_polyphony(mut self, polyphony: usize) -> Self {
        self.polyphony = polyphony;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "sample rate must be positive, got {}",
                self.sample_rate
            )));
        }
        if self.polyphony == 0 || self.polyphony > MAX_POLYPHONY {
            return Err(Error::InvalidConfig(format!(
                "polyphony must be in 1..={MAX_POLYPHONY}, got {}",
                self.polyphony
            )));
        }
        Ok(())
    }

    /// Seed for voice `index`, spread so neighbouring voices do not correlate.
    pub fn voice_seed(&self, index: usize) -> u64 {
        self.seed
            .wrapping_add((index as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000.0,
            polyphony: 8,
            seed: DEFAULT_SEED,
        }
    }
}
