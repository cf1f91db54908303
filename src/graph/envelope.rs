use crate::{
    dsp::envelope::Envelope,
    graph::{
        output::Output,
        processor::{InputSpec, Inputs, Processor},
    },
};

/// ADSR envelope driven by gate triggers.
///
/// Note-on and note-off arrive as triggers on separate inputs so both can
/// land in the same block; the block is split at each event's offset.
pub struct EnvelopeGenerator {
    env: Envelope,
}

impl EnvelopeGenerator {
    pub const NOTE_ON: usize = 0;
    pub const NOTE_OFF: usize = 1;
    pub const ATTACK: usize = 2;
    pub const DECAY: usize = 3;
    pub const SUSTAIN: usize = 4;
    pub const RELEASE: usize = 5;

    /// Output indices.
    pub const LEVEL: usize = 0;
    /// 1.0 while the envelope is running, 0.0 once the release has finished.
    pub const ACTIVE: usize = 1;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            env: Envelope::new(sample_rate),
        }
    }
}

impl Processor for EnvelopeGenerator {
    fn name(&self) -> &'static str {
        "envelope"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        const INPUTS: &[InputSpec] = &[
            InputSpec::fixed("note_on"),
            InputSpec::fixed("note_off"),
            InputSpec::modulatable("attack"),
            InputSpec::modulatable("decay"),
            InputSpec::modulatable("sustain"),
            InputSpec::modulatable("release"),
        ];
        INPUTS
    }

    fn num_outputs(&self) -> usize {
        2
    }

    fn process(&mut self, inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        self.env.set_params(
            inputs.first(Self::ATTACK),
            inputs.first(Self::DECAY),
            inputs.first(Self::SUSTAIN),
            inputs.first(Self::RELEASE),
        );

        let on = inputs.get(Self::NOTE_ON).trigger.map(|t| (t.offset, true));
        let off = inputs.get(Self::NOTE_OFF).trigger.map(|t| (t.offset, false));
        // Same offset: the note starts before it is released.
        let events = match (on, off) {
            (Some(on), Some(off)) if off.0 < on.0 => [Some(off), Some(on)],
            (on, off) => [on, off],
        };

        let level = &mut outputs[Self::LEVEL].buffer[..block_size];
        let mut position = 0;
        for (offset, gate) in events.into_iter().flatten() {
            let offset = offset.clamp(position, block_size);
            self.env.render(&mut level[position..offset]);
            position = offset;
            if gate {
                self.env.note_on();
            } else {
                self.env.note_off();
            }
        }
        self.env.render(&mut level[position..]);

        let active = if self.env.is_active() { 1.0 } else { 0.0 };
        outputs[Self::ACTIVE].fill(active, block_size);
    }

    fn reset(&mut self) {
        self.env.reset();
    }
}
