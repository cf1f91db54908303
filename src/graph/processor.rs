use crate::graph::{
    modulation::ModulationSum,
    output::{Output, Rate, Trigger},
};

/// Index of a processor inside its [`Graph`](crate::graph::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessorId(pub usize);

/// One output of one processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OutputId {
    pub processor: ProcessorId,
    pub index: usize,
}

impl OutputId {
    pub fn new(processor: ProcessorId, index: usize) -> Self {
        Self { processor, index }
    }
}

impl ProcessorId {
    /// Output `index` of this processor.
    pub fn output(self, index: usize) -> OutputId {
        OutputId::new(self, index)
    }
}

/// Static description of one input role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub name: &'static str,
    /// Whether modulation connections may target this input.
    pub modulatable: bool,
}

impl InputSpec {
    pub const fn fixed(name: &'static str) -> Self {
        Self {
            name,
            modulatable: false,
        }
    }

    pub const fn modulatable(name: &'static str) -> Self {
        Self {
            name,
            modulatable: true,
        }
    }
}

/// Core trait for graph processors
///
/// A processor reads the outputs bound to its inputs (already computed for
/// this block) and writes only its own outputs. `process` runs on the audio
/// thread: it must not allocate, lock or fail, and corrects bad input values
/// in place.
pub trait Processor: Send {
    /// Short type name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Ordered input roles.
    fn inputs(&self) -> &'static [InputSpec];

    fn num_outputs(&self) -> usize {
        1
    }

    /// Rate of every output this processor owns.
    fn rate(&self) -> Rate {
        Rate::Audio
    }

    fn process(&mut self, inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize);

    /// Return to the freshly constructed state.
    ///
    /// Default implementation does nothing (stateless processors).
    fn reset(&mut self) {}

    /// Receive a new value from the control thread. Only controls use this.
    fn set_value(&mut self, _value: f32) {}

    /// Queue an event for the next block. Only trigger sources use this.
    fn schedule(&mut self, _trigger: Trigger) {}
}

#[derive(Clone, Copy)]
enum Sources<'a> {
    Graph {
        arena: &'a [Vec<Output>],
        bindings: &'a [Option<OutputId>],
        modulated: &'a [Option<ModulationSum>],
    },
    Direct(&'a [Output]),
}

/// Read-only view of a processor's inputs for one block.
///
/// Unbound inputs read as a silent control-rate output.
pub struct Inputs<'a> {
    sources: Sources<'a>,
    silence: &'a Output,
}

impl<'a> Inputs<'a> {
    pub(crate) fn graph(
        arena: &'a [Vec<Output>],
        bindings: &'a [Option<OutputId>],
        modulated: &'a [Option<ModulationSum>],
        silence: &'a Output,
    ) -> Self {
        Self {
            sources: Sources::Graph {
                arena,
                bindings,
                modulated,
            },
            silence,
        }
    }

    /// Inputs taken positionally from `outputs`, for driving a processor
    /// outside a graph.
    pub fn direct(outputs: &'a [Output], silence: &'a Output) -> Self {
        Self {
            sources: Sources::Direct(outputs),
            silence,
        }
    }

    pub fn get(&self, index: usize) -> &'a Output {
        match self.sources {
            Sources::Graph {
                arena,
                bindings,
                modulated,
            } => {
                if let Some(Some(sum)) = modulated.get(index) {
                    return &sum.output;
                }
                bindings
                    .get(index)
                    .copied()
                    .flatten()
                    .and_then(|id| arena.get(id.processor.0)?.get(id.index))
                    .unwrap_or(self.silence)
            }
            Sources::Direct(outputs) => outputs.get(index).unwrap_or(self.silence),
        }
    }

    /// First sample of input `index`.
    #[inline]
    pub fn first(&self, index: usize) -> f32 {
        self.get(index).first()
    }

    #[inline]
    pub fn at(&self, index: usize, sample: usize) -> f32 {
        self.get(index).at(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_inputs_fall_back_to_silence() {
        let mut a = Output::control();
        a.fill(3.0, 1);
        let outputs = [a];
        let silence = Output::control();
        let inputs = Inputs::direct(&outputs, &silence);

        assert_eq!(inputs.first(0), 3.0);
        assert_eq!(inputs.at(0, 100), 3.0);
        assert_eq!(inputs.first(5), 0.0);
        assert!(!inputs.get(5).triggered());
    }
}
