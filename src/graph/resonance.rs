use crate::{
    dsp::filter::FilterType,
    graph::{
        output::{Output, Rate},
        processor::{InputSpec, Inputs, Processor},
    },
};

/// Resonance a shelving filter reports: neutral, since Q only sets its slope.
pub const NEUTRAL_RESONANCE: f32 = 1.0;

/// Passes the resonance control through, except for shelving filter types
/// where it always reads [`NEUTRAL_RESONANCE`].
///
/// Anything downstream (the filter itself, a response display) can then treat
/// the value as meaningful without knowing which shapes ignore it.
pub struct ResonanceGate;

impl ResonanceGate {
    pub const FILTER_TYPE: usize = 0;
    pub const RESONANCE: usize = 1;

    /// Gated resonance for a raw filter-type control value.
    pub fn gate(filter_type: f32, resonance: f32) -> f32 {
        if FilterType::from_control(filter_type).is_shelf() {
            NEUTRAL_RESONANCE
        } else {
            resonance
        }
    }
}

impl Processor for ResonanceGate {
    fn name(&self) -> &'static str {
        "resonance_gate"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        const INPUTS: &[InputSpec] = &[
            InputSpec::fixed("filter_type"),
            InputSpec::modulatable("resonance"),
        ];
        INPUTS
    }

    fn rate(&self) -> Rate {
        Rate::Control
    }

    fn process(&mut self, inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        let value = Self::gate(inputs.first(Self::FILTER_TYPE), inputs.first(Self::RESONANCE));
        outputs[0].fill(value, block_size);
    }
}
