use crate::graph::{
    output::{Output, Rate},
    processor::OutputId,
};

/*
Modulation Routing
==================

A modulation connection lets one signal continuously push a parameter around
its base value:

    effective = base + Σ amount_i * source_i

`base` is whatever the destination input is normally bound to (usually a
named control). The graph keeps one ModulationSum per modulated input. Before
the destination processor runs, the sum is evaluated into its own Output and
the processor reads that instead of the plain binding, so processors never
know whether an input is modulated.

Rates combine upward: if the base or any source is audio-rate the summed
output is audio-rate, otherwise only sample 0 is computed.

Sources are allowed to depend on the destination (an LFO whose rate is
modulated by the oscillator it modulates, say). Such a source has not run
yet when the sum is taken, so the sum sees its previous block: one block of
latency instead of a configuration error.
*/

/// Most modulation sources that may sum into one input.
pub const MAX_MODULATIONS_PER_INPUT: usize = 16;

/// A named routing edge: `source` output drives `destination` input by `amount`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ModulationConnection {
    pub source: String,
    pub destination: String,
    pub amount: f32,
}

impl ModulationConnection {
    pub fn new(source: impl Into<String>, destination: impl Into<String>, amount: f32) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            amount,
        }
    }

    /// Same endpoints, ignoring the amount.
    pub fn same_route(&self, other: &ModulationConnection) -> bool {
        self.source == other.source && self.destination == other.destination
    }
}

/// Per-input accumulator of modulation sources.
pub(crate) struct ModulationSum {
    pub(crate) output: Output,
    sources: Vec<(OutputId, f32)>,
}

impl ModulationSum {
    pub(crate) fn new() -> Self {
        Self {
            output: Output::control(),
            sources: Vec::with_capacity(MAX_MODULATIONS_PER_INPUT),
        }
    }

    /// Add a source or update its amount. Returns false when the input is full.
    pub(crate) fn set(&mut self, source: OutputId, amount: f32) -> bool {
        if let Some(entry) = self.sources.iter_mut().find(|(id, _)| *id == source) {
            entry.1 = amount;
            return true;
        }
        if self.sources.len() >= MAX_MODULATIONS_PER_INPUT {
            return false;
        }
        self.sources.push((source, amount));
        true
    }

    pub(crate) fn remove(&mut self, source: OutputId) -> bool {
        let before = self.sources.len();
        self.sources.retain(|(id, _)| *id != source);
        self.sources.len() != before
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub(crate) fn source_ids(&self) -> impl Iterator<Item = OutputId> + '_ {
        self.sources.iter().map(|(id, _)| *id)
    }

    /// Evaluate `base + Σ amount * source` into this sum's output.
    pub(crate) fn compute(
        &mut self,
        base: &Output,
        arena: &[Vec<Output>],
        silence: &Output,
        block_size: usize,
    ) {
        let audio = base.rate == Rate::Audio
            || self
                .sources
                .iter()
                .any(|(id, _)| lookup(arena, silence, *id).rate == Rate::Audio);
        self.output.rate = if audio { Rate::Audio } else { Rate::Control };
        self.output.trigger = base.trigger;

        let samples = if audio { block_size } else { 1 };
        for i in 0..samples {
            let mut value = base.at(i);
            for &(id, amount) in &self.sources {
                value += amount * lookup(arena, silence, id).at(i);
            }
            self.output.buffer[i] = if value.is_finite() { value } else { 0.0 };
        }
    }
}

fn lookup<'a>(arena: &'a [Vec<Output>], silence: &'a Output, id: OutputId) -> &'a Output {
    arena
        .get(id.processor.0)
        .and_then(|outputs| outputs.get(id.index))
        .unwrap_or(silence)
}
