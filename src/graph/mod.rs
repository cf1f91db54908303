//! The processor graph: routing, modulation and the processors themselves.
//!
//! Processors live in an arena owned by [`Graph`] and refer to each other's
//! outputs only through [`OutputId`] handles. The graph orders them
//! topologically, evaluates modulation sums, and runs one block at a time
//! without allocating.

/// Graph arena, evaluation order and named registries.
pub mod engine;
/// ADSR envelope processor with sample-accurate gate events.
pub mod envelope;
/// State-variable filter processor.
pub mod filter;
/// Control-rate low frequency oscillator.
pub mod lfo;
/// Multiply and pitch-to-phase-increment helpers.
pub mod math;
/// Modulation connections and per-input modulation sums.
pub mod modulation;
/// Two-slot unison oscillator bank.
pub mod oscillators;
/// Output buffers, rates and trigger events.
pub mod output;
/// The processor contract and input views.
pub mod processor;
/// Neutral resonance for shelving filter types.
pub mod resonance;
/// Named controls and trigger sources.
pub mod value;

pub use engine::Graph;
pub use modulation::{ModulationConnection, MAX_MODULATIONS_PER_INPUT};
pub use output::{Output, Rate, Trigger};
pub use processor::{InputSpec, Inputs, OutputId, Processor, ProcessorId};
