pub mod dsp;
pub mod error;
pub mod graph; // Processor graph, routing and modulation
pub mod synth; // Voice management, polyphony and the control boundary

pub use error::{Error, Result};
pub use graph::{Graph, ModulationConnection, Output, Processor, Rate, Trigger};
pub use synth::{EngineConfig, Snapshot, SynthEngine, SynthHandle};

pub const MAX_BLOCK_SIZE: usize = 2048;
/// Most unison voices a single oscillator slot can play.
pub const MAX_UNISON: usize = 15;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
