// Purpose: Voice management, polyphony and the control boundary
// This layer sits above the processor graph and manages multiple voices

pub mod config;
pub mod engine;
pub mod handle;
pub mod message;
pub mod patch;
pub mod snapshot;
pub mod voice;

pub use config::EngineConfig;
pub use engine::SynthEngine;
pub use handle::SynthHandle;
pub use message::{MessageReceiver, SynthMessage};
pub use patch::{Parameter, PARAMETERS};
pub use snapshot::Snapshot;
