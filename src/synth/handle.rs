use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::{
    error::Result,
    graph::{ModulationConnection, Output},
    synth::{engine::SynthEngine, snapshot::Snapshot},
};

/// Shared access to a [`SynthEngine`] from several threads.
///
/// Every call takes the engine lock for exactly its own duration, so a
/// parameter change or a new modulation route is applied between blocks and
/// never observed half-way through one. The audio thread calls
/// [`SynthHandle::process`]; control threads use the rest.
#[derive(Clone)]
pub struct SynthHandle {
    engine: Arc<Mutex<SynthEngine>>,
}

impl SynthHandle {
    pub fn new(engine: SynthEngine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn set_parameter(&self, name: &str, value: f32) -> Result<()> {
        self.engine.lock().set_parameter(name, value)
    }

    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.engine.lock().parameter(name)
    }

    pub fn connect_modulation(&self, connection: &ModulationConnection) -> Result<()> {
        self.engine.lock().connect_modulation(connection)
    }

    pub fn disconnect_modulation(&self, connection: &ModulationConnection) -> bool {
        self.engine.lock().disconnect_modulation(connection)
    }

    /// Copy of a named modulation source as of the last block.
    pub fn output(&self, name: &str) -> Result<Output> {
        self.engine.lock().output(name).cloned()
    }

    /// First sample of a named modulation source, for meters.
    pub fn output_value(&self, name: &str) -> Result<f32> {
        self.engine.lock().output(name).map(Output::first)
    }

    pub fn active_voice_count(&self) -> usize {
        self.engine.lock().active_voice_count()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.lock().snapshot()
    }

    pub fn restore(&self, snapshot: &Snapshot) -> Result<()> {
        self.engine.lock().restore(snapshot)
    }

    pub fn note_on(&self, note: u8, velocity: u8, offset: usize) {
        self.engine.lock().note_on(note, velocity, offset);
    }

    pub fn note_off(&self, note: u8, offset: usize) {
        self.engine.lock().note_off(note, offset);
    }

    pub fn process(&self, out: &mut [f32]) {
        self.engine.lock().process(out);
    }

    /// Hold the engine for a batch of calls.
    pub fn lock(&self) -> MutexGuard<'_, SynthEngine> {
        self.engine.lock()
    }
}
