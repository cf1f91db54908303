//! Error types for unison_dsp.
//!
//! Only configuration-time operations (building graphs, naming controls,
//! routing modulation) can fail. Anything detected while a block is being
//! processed is clamped in place instead.

use thiserror::Error;

/// Result type alias for unison_dsp operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported at the control boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// No control with this name exists.
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// No modulation source with this name exists.
    #[error("unknown modulation source: {0}")]
    UnknownModulationSource(String),

    /// No modulation destination or parameter with this name exists.
    #[error("unknown modulation destination: {0}")]
    UnknownModulationDestination(String),

    /// The destination exists but its input does not accept modulation.
    #[error("parameter is not modulatable: {0}")]
    NotModulatable(String),

    /// The destination already sums as many modulations as it declares.
    #[error("modulation limit of {limit} reached for {destination}")]
    ModulationLimit { destination: String, limit: usize },

    /// A control, source or destination name was registered twice.
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// Plugging this edge would close a loop of non-modulation edges.
    #[error("connecting {from} -> {to} would create a cycle")]
    Cycle { from: String, to: String },

    /// A processor or input index does not exist in the graph.
    #[error("invalid input {input} on processor {processor}")]
    InvalidInput { processor: usize, input: usize },

    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
