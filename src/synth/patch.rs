//! The standard voice patch and its parameter table.

use crate::{
    error::Result,
    graph::{
        envelope::EnvelopeGenerator,
        filter::Filter,
        lfo::Lfo,
        math::{Multiply, PhaseIncrement},
        oscillators::UnisonOscillatorBank,
        resonance::ResonanceGate,
        Graph, OutputId, ProcessorId,
    },
};

/*
Voice Patch
===========

Every voice is one graph built from this patch:

  note ──┬─> pitch 1 (+ transpose, tune) ─┐
         └─> pitch 2 (+ transpose, tune) ─┤
                                          v
  note_on ──────────────────────> UnisonOscillatorBank ── mix ──> Filter ──┐
                                                                  ^        │
  filter_type, filter_resonance ──> ResonanceGate ── resonance ───┘        │
                                                                           v
  note_on / note_off ──> amp envelope ─────────────────────────────> multiply
                                                                           │
  velocity, volume ──> multiply ─────────────────────────────────> multiply ──> out

  note_on / note_off ──> mod envelope     (modulation source only)
  note_on ──> lfo                         (modulation source only)

Every entry of PARAMETERS is a named control. Modulatable entries are also
registered as modulation destinations under the same name, pointing at the
input that control feeds.
*/

/// One named control of the voice patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    pub name: &'static str,
    pub default: f32,
    /// Suggested range for editors; the engine itself does not enforce it.
    pub min: f32,
    pub max: f32,
    pub modulatable: bool,
}

const fn param(name: &'static str, default: f32, min: f32, max: f32, modulatable: bool) -> Parameter {
    Parameter {
        name,
        default,
        min,
        max,
        modulatable,
    }
}

#[rustfmt::skip]
pub const PARAMETERS: &[Parameter] = &[
    param("osc_1_waveform",       3.0,   0.0,  10.0,  false),
    param("osc_1_transpose",      0.0, -48.0,  48.0,  true),
    param("osc_1_tune",           0.0,-100.0, 100.0,  true),
    param("osc_1_unison_voices",  1.0,   1.0,  15.0,  false),
    param("osc_1_unison_detune", 10.0,   0.0, 100.0,  true),
    param("osc_1_harmonize",      0.0,   0.0,   1.0,  false),
    param("osc_2_waveform",       3.0,   0.0,  10.0,  false),
    param("osc_2_transpose",    -12.0, -48.0,  48.0,  true),
    param("osc_2_tune",           0.0,-100.0, 100.0,  true),
    param("osc_2_unison_voices",  1.0,   1.0,  15.0,  false),
    param("osc_2_unison_detune", 10.0,   0.0, 100.0,  true),
    param("osc_2_harmonize",      0.0,   0.0,   1.0,  false),
    param("cross_modulation",     0.0,  -1.0,   1.0,  true),
    param("filter_type",          0.0,   0.0,   7.0,  false),
    param("filter_cutoff",       80.0,  28.0, 127.0,  true),
    param("filter_resonance",   0.707,   0.1,  16.0,  true),
    param("filter_gain",          0.0, -24.0,  24.0,  true),
    param("amp_attack",          0.01,   0.0,   4.0,  true),
    param("amp_decay",            0.3,   0.0,   4.0,  true),
    param("amp_sustain",          0.8,   0.0,   1.0,  true),
    param("amp_release",          0.3,   0.0,   4.0,  true),
    param("mod_attack",          0.01,   0.0,   4.0,  true),
    param("mod_decay",            0.3,   0.0,   4.0,  true),
    param("mod_sustain",          0.0,   0.0,   1.0,  true),
    param("mod_release",          0.3,   0.0,   4.0,  true),
    param("lfo_1_frequency",      2.0,   0.0,  20.0,  true),
    param("lfo_1_waveform",       0.0,   0.0,  10.0,  false),
    param("volume",               0.5,   0.0,   1.0,  true),
];

/// Names of the modulation sources every voice publishes.
pub const SOURCES: &[&str] = &[
    "amp_envelope",
    "lfo_1",
    "mod_envelope",
    "note",
    "osc_1",
    "osc_2",
    "velocity",
];

/// Trigger sources the voice schedules note events on.
pub const NOTE_ON: &str = "note_on";
pub const NOTE_OFF: &str = "note_off";
/// Internal controls the voice sets per note.
pub const NOTE: &str = "note";
pub const VELOCITY: &str = "velocity";

pub fn parameter(name: &str) -> Option<&'static Parameter> {
    PARAMETERS.iter().find(|p| p.name == name)
}

/// A built voice graph and the outputs the voice reads back.
pub struct VoicePatch {
    pub graph: Graph,
    /// Final audio output.
    pub output: OutputId,
    /// Amplitude envelope's active flag.
    pub active: OutputId,
}

struct Builder {
    graph: Graph,
}

impl Builder {
    /// Add the named parameter's control and feed it into `processor.input`.
    fn feed(&mut self, name: &str, processor: ProcessorId, input: usize) -> Result<OutputId> {
        let control = match parameter(name) {
            Some(param) => {
                let control = self.graph.add_control(name, param.default)?;
                if param.modulatable {
                    self.graph.expose_destination(name, processor, input)?;
                }
                control
            }
            None => self.graph.add_control(name, 0.0)?,
        };
        self.graph.plug(control.output(0), processor, input)?;
        Ok(control.output(0))
    }

    /// Feed an already existing output (control or otherwise) into an input.
    fn plug(&mut self, source: OutputId, processor: ProcessorId, input: usize) -> Result<()> {
        self.graph.plug(source, processor, input)
    }
}

/// Build one voice graph with every parameter at its default.
pub fn build_voice(sample_rate: f32, seed: u64) -> Result<VoicePatch> {
    let mut b = Builder {
        graph: Graph::new(),
    };

    let note_on = b.graph.add_trigger(NOTE_ON)?.output(0);
    let note_off = b.graph.add_trigger(NOTE_OFF)?.output(0);
    let note = b.graph.add_control(NOTE, 60.0)?.output(0);
    let velocity = b.graph.add_control(VELOCITY, 1.0)?.output(0);

    // Pitch
    let pitch_1 = b.graph.add(PhaseIncrement::new(sample_rate));
    let pitch_2 = b.graph.add(PhaseIncrement::new(sample_rate));
    b.plug(note, pitch_1, PhaseIncrement::NOTE)?;
    b.plug(note, pitch_2, PhaseIncrement::NOTE)?;
    b.feed("osc_1_transpose", pitch_1, PhaseIncrement::TRANSPOSE)?;
    b.feed("osc_1_tune", pitch_1, PhaseIncrement::TUNE)?;
    b.feed("osc_2_transpose", pitch_2, PhaseIncrement::TRANSPOSE)?;
    b.feed("osc_2_tune", pitch_2, PhaseIncrement::TUNE)?;

    // Oscillators
    type Bank = UnisonOscillatorBank;
    let bank = b.graph.add(Bank::new(seed));
    b.plug(pitch_1.output(0), bank, Bank::OSC_1_PHASE_INC)?;
    b.plug(pitch_2.output(0), bank, Bank::OSC_2_PHASE_INC)?;
    b.feed("osc_1_waveform", bank, Bank::OSC_1_WAVEFORM)?;
    b.feed("osc_1_unison_voices", bank, Bank::OSC_1_VOICES)?;
    b.feed("osc_1_unison_detune", bank, Bank::OSC_1_DETUNE)?;
    b.feed("osc_1_harmonize", bank, Bank::OSC_1_HARMONIZE)?;
    b.feed("osc_2_waveform", bank, Bank::OSC_2_WAVEFORM)?;
    b.feed("osc_2_unison_voices", bank, Bank::OSC_2_VOICES)?;
    b.feed("osc_2_unison_detune", bank, Bank::OSC_2_DETUNE)?;
    b.feed("osc_2_harmonize", bank, Bank::OSC_2_HARMONIZE)?;
    b.feed("cross_modulation", bank, Bank::CROSS_MOD)?;
    b.plug(note_on, bank, Bank::RESET)?;

    // Filter; its type control also drives the resonance gate.
    let gate = b.graph.add(ResonanceGate);
    let filter = b.graph.add(Filter::new(sample_rate));
    let filter_type = b.feed("filter_type", filter, Filter::FILTER_TYPE)?;
    b.plug(filter_type, gate, ResonanceGate::FILTER_TYPE)?;
    b.feed("filter_resonance", gate, ResonanceGate::RESONANCE)?;
    b.plug(gate.output(0), filter, Filter::RESONANCE)?;
    b.plug(bank.output(Bank::MIX), filter, Filter::AUDIO)?;
    b.feed("filter_cutoff", filter, Filter::CUTOFF)?;
    b.feed("filter_gain", filter, Filter::GAIN_DB)?;

    // Envelopes
    let amp_env = b.graph.add(EnvelopeGenerator::new(sample_rate));
    b.plug(note_on, amp_env, EnvelopeGenerator::NOTE_ON)?;
    b.plug(note_off, amp_env, EnvelopeGenerator::NOTE_OFF)?;
    b.feed("amp_attack", amp_env, EnvelopeGenerator::ATTACK)?;
    b.feed("amp_decay", amp_env, EnvelopeGenerator::DECAY)?;
    b.feed("amp_sustain", amp_env, EnvelopeGenerator::SUSTAIN)?;
    b.feed("amp_release", amp_env, EnvelopeGenerator::RELEASE)?;

    let mod_env = b.graph.add(EnvelopeGenerator::new(sample_rate));
    b.plug(note_on, mod_env, EnvelopeGenerator::NOTE_ON)?;
    b.plug(note_off, mod_env, EnvelopeGenerator::NOTE_OFF)?;
    b.feed("mod_attack", mod_env, EnvelopeGenerator::ATTACK)?;
    b.feed("mod_decay", mod_env, EnvelopeGenerator::DECAY)?;
    b.feed("mod_sustain", mod_env, EnvelopeGenerator::SUSTAIN)?;
    b.feed("mod_release", mod_env, EnvelopeGenerator::RELEASE)?;

    // LFO
    let lfo = b.graph.add(Lfo::new(sample_rate));
    b.feed("lfo_1_frequency", lfo, Lfo::FREQUENCY)?;
    b.feed("lfo_1_waveform", lfo, Lfo::WAVEFORM)?;
    b.plug(note_on, lfo, Lfo::RETRIGGER)?;

    // Output stage
    let amplified = b.graph.add(Multiply);
    b.plug(filter.output(0), amplified, Multiply::LEFT)?;
    b.plug(
        amp_env.output(EnvelopeGenerator::LEVEL),
        amplified,
        Multiply::RIGHT,
    )?;

    let level = b.graph.add(Multiply);
    b.plug(velocity, level, Multiply::LEFT)?;
    b.feed("volume", level, Multiply::RIGHT)?;

    let out = b.graph.add(Multiply);
    b.plug(amplified.output(0), out, Multiply::LEFT)?;
    b.plug(level.output(0), out, Multiply::RIGHT)?;

    // Modulation sources
    let graph = &mut b.graph;
    graph.expose_source("amp_envelope", amp_env.output(EnvelopeGenerator::LEVEL))?;
    graph.expose_source("lfo_1", lfo.output(0))?;
    graph.expose_source("mod_envelope", mod_env.output(EnvelopeGenerator::LEVEL))?;
    graph.expose_source("note", note)?;
    graph.expose_source("osc_1", bank.output(Bank::OSC_1_OUT))?;
    graph.expose_source("osc_2", bank.output(Bank::OSC_2_OUT))?;
    graph.expose_source("velocity", velocity)?;

    Ok(VoicePatch {
        graph: b.graph,
        output: out.output(0),
        active: amp_env.output(EnvelopeGenerator::ACTIVE),
    })
}
