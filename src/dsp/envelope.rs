use crate::MIN_TIME;

/*
ADSR Envelope
=============

A linear attack/decay/sustain/release generator. It drives the amplitude of
every voice (and doubles as a modulation source), and the voice allocator
watches it to know when a released voice has gone silent.

  Level
    1.0 ┐     ╱╲
        │    ╱  ╲___________
    S   │   ╱               ╲
        │  ╱                 ╲
    0.0 └─╱───────────────────╲──→ Time
        Attack Decay  Sustain  Release

Stage durations become per-sample increments:

    increment = target_change / (time_seconds * sample_rate)

Gate events arrive in the middle of blocks. The envelope itself only knows
how to advance one sample; the graph processor that owns it splits each block
at the event offset, advances up to the offset, applies note_on/note_off and
continues. That keeps retriggers sample-accurate without the envelope knowing
anything about blocks.

Transitions:

    Idle ──note_on──→ Attack ──level=1──→ Decay ──level=S──→ Sustain
                        │                   │                   │
                        └──────note_off─────┴──────note_off─────┴──→ Release ──level=0──→ Idle

note_off releases from the CURRENT level, not from the sustain level, so a
short note released mid-attack fades from where it got to instead of clicking.
Release snapshots its start level and length, then interpolates to exactly 0.
*/

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeState {
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

pub struct Envelope {
    sample_rate: f32,

    attack_time: f32,
    decay_time: f32,
    sustain_level: f32,
    release_time: f32,

    stage: EnvelopeState,
    level: f32,

    decay_start_level: f32,

    release_start_level: f32,
    release_total_samples: u32,
    release_elapsed_samples: u32,
}

impl Envelope {
    pub fn new(sample_rate: f32) -> Self {
        Self::adsr(sample_rate, 0.01, 0.1, 0.7, 0.3)
    }

    pub fn adsr(sample_rate: f32, attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        let mut env = Self {
            sample_rate,
            attack_time: MIN_TIME,
            decay_time: MIN_TIME,
            sustain_level: 0.0,
            release_time: MIN_TIME,
            stage: EnvelopeState::Idle,
            level: 0.0,
            decay_start_level: 0.0,
            release_start_level: 0.0,
            release_total_samples: 1,
            release_elapsed_samples: 0,
        };
        env.set_params(attack, decay, sustain, release);
        env
    }

    /// Update the stage times (seconds) and sustain level, clamping bad values.
    pub fn set_params(&mut self, attack: f32, decay: f32, sustain: f32, release: f32) {
        use crate::dsp::clamp_finite;

        self.attack_time = clamp_finite(attack, MIN_TIME, MAX_STAGE_TIME, MIN_TIME);
        self.decay_time = clamp_finite(decay, MIN_TIME, MAX_STAGE_TIME, MIN_TIME);
        self.sustain_level = clamp_finite(sustain, 0.0, 1.0, 0.0);
        self.release_time = clamp_finite(release, MIN_TIME, MAX_STAGE_TIME, MIN_TIME);
    }

    /// Gate high: restart the attack from zero.
    pub fn note_on(&mut self) {
        self.level = 0.0;
        self.stage = EnvelopeState::Attack;
        self.release_elapsed_samples = 0;
    }

    /// Gate low: start the release phase from the current level.
    pub fn note_off(&mut self) {
        if matches!(self.stage, EnvelopeState::Idle | EnvelopeState::Release) {
            return;
        }

        self.release_start_level = self.level;
        self.release_total_samples = (self.release_time * self.sample_rate).round().max(1.0) as u32;
        self.release_elapsed_samples = 0;
        self.stage = EnvelopeState::Release;
    }

    /// Advance the envelope by one sample and return the new level.
    pub fn next_sample(&mut self) -> f32 {
        match self.stage {
            EnvelopeState::Idle => {
                self.level = 0.0;
            }
            EnvelopeState::Attack => {
                self.level += 1.0 / (self.attack_time * self.sample_rate);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.decay_start_level = 1.0;
                    self.stage = EnvelopeState::Decay;
                }
            }
            EnvelopeState::Decay => {
                let target = self.sustain_level;
                let total_drop = self.decay_start_level - target;
                self.level -= total_drop / (self.decay_time * self.sample_rate);
                if self.level <= target {
                    self.level = target;
                    self.stage = EnvelopeState::Sustain;
                }
            }
            EnvelopeState::Sustain => {
                // Follows sustain changes while held.
                self.level = self.sustain_level;
            }
            EnvelopeState::Release => {
                let progress =
                    self.release_elapsed_samples as f32 / self.release_total_samples as f32;
                self.level = (self.release_start_level * (1.0 - progress)).max(0.0);
                self.release_elapsed_samples = self.release_elapsed_samples.saturating_add(1);
                if self.release_elapsed_samples >= self.release_total_samples {
                    self.level = 0.0;
                    self.stage = EnvelopeState::Idle;
                }
            }
        }

        debug_assert!((0.0..=1.0).contains(&self.level));
        self.level
    }

    /// Render a block of envelope values into the buffer.
    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// True until the release has run out.
    pub fn is_active(&self) -> bool {
        !matches!(self.stage, EnvelopeState::Idle)
    }

    pub fn reset(&mut self) {
        self.stage = EnvelopeState::Idle;
        self.level = 0.0;
        self.decay_start_level = 0.0;
        self.release_elapsed_samples = 0;
        self.release_start_level = 0.0;
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn state(&self) -> EnvelopeState {
        self.stage
    }
}

/// Longest accepted stage time in seconds.
pub const MAX_STAGE_TIME: f32 = 30.0;
