use crate::{
    error::Result,
    graph::{Graph, Output, OutputId, Trigger},
    synth::patch::{self, VoicePatch},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Free,      // Available for allocation
    Active,    // Playing, envelope in attack/decay/sustain
    Releasing, // Key released, envelope in release phase
}

/// A single voice: one complete processor graph plus allocation state.
pub struct Voice {
    note: u8,
    velocity: u8,
    state: VoiceState,
    age: u64,
    graph: Graph,
    output: OutputId,
    active: OutputId,
}

impl Voice {
    pub fn new(sample_rate: f32, seed: u64) -> Result<Self> {
        let VoicePatch {
            graph,
            output,
            active,
        } = patch::build_voice(sample_rate, seed)?;
        Ok(Self {
            note: 0,
            velocity: 0,
            state: VoiceState::Free,
            age: 0,
            graph,
            output,
            active,
        })
    }

    /// Start `note` at sample `offset` of the next block.
    pub fn start(&mut self, note: u8, velocity: u8, offset: usize, age: u64) {
        self.note = note;
        self.velocity = velocity;
        self.state = VoiceState::Active;
        self.age = age;

        // Every patch from `build_voice` has these controls.
        let result = self.graph.set_control(patch::NOTE, note as f32);
        debug_assert!(result.is_ok(), "note: {result:?}");
        let result = self.graph.set_control(patch::VELOCITY, velocity as f32 / 127.0);
        debug_assert!(result.is_ok(), "velocity: {result:?}");
        let result = self.graph.schedule(patch::NOTE_ON, Trigger { offset, value: 1.0 });
        debug_assert!(result.is_ok(), "note_on: {result:?}");
    }

    pub fn release(&mut self, offset: usize) {
        if self.state == VoiceState::Active {
            self.state = VoiceState::Releasing;
            let result = self.graph.schedule(patch::NOTE_OFF, Trigger { offset, value: 1.0 });
            debug_assert!(result.is_ok(), "note_off: {result:?}");
        }
    }

    /// Run the graph for one block. The result is in [`Voice::output`].
    pub fn render(&mut self, block_size: usize) {
        self.graph.process(block_size);

        // If voice is releasing and envelope has finished, mark as free
        if self.state == VoiceState::Releasing && !self.envelope_active() {
            self.free();
        }
    }

    pub fn output(&self) -> Option<&Output> {
        self.graph.output_of(self.output)
    }

    fn envelope_active(&self) -> bool {
        self.graph
            .output_of(self.active)
            .map_or(false, |out| out.first() > 0.0)
    }

    pub fn free(&mut self) {
        self.state = VoiceState::Free;
        self.note = 0;
        self.velocity = 0;
    }

    /// Free the voice and return its graph to its initial state.
    ///
    /// Controls go back to their patch defaults too; the caller re-applies
    /// any parameter values it wants to keep.
    pub fn reset(&mut self) {
        self.free();
        self.age = 0;
        self.graph.reset();
    }

    pub fn is_free(&self) -> bool {
        self.state == VoiceState::Free
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, VoiceState::Active | VoiceState::Releasing)
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn age(&self) -> u64 {
        self.age
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }
}
