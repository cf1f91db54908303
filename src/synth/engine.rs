use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace, warn};

use crate::{
    error::{Error, Result},
    graph::{ModulationConnection, Output, MAX_MODULATIONS_PER_INPUT},
    synth::{
        config::EngineConfig,
        message::{MessageReceiver, SynthMessage},
        patch::{self, PARAMETERS},
        snapshot::Snapshot,
        voice::{Voice, VoiceState},
    },
    MAX_BLOCK_SIZE,
};

/*
SynthEngine
===========

A fixed pool of voices, each a complete processor graph built from the
standard patch, plus the state every voice shares:

  parameters    name → value, applied to every voice graph
  modulations   the active routing set, connected in every voice graph

Control-path calls (set_parameter, connect_modulation, restore, ...) update
the shared state and fan it out to all voices, so a voice picked up by the
next note already sounds like the current patch. process() never allocates:
voices, graphs and scratch buffers all exist from construction.

Voice allocation
----------------

  1. a free voice
  2. else the oldest releasing voice
  3. else the oldest active voice

"Oldest" is the voice with the lowest note-on serial number. A voice goes back to Free when its
amplitude envelope reports that the release has finished.

Note events
-----------

Events from the MessageReceiver are drained at the start of process() and
land at their offset inside the first block rendered by that call. Offsets
past that block are clamped to its last sample.
*/

pub struct SynthEngine {
    config: EngineConfig,
    voices: Vec<Voice>,
    parameters: BTreeMap<String, f32>,
    modulations: Vec<ModulationConnection>,
    receiver: Option<Box<dyn MessageReceiver + Send>>,
    notes_started: u64,
    last_started: Option<usize>,
}

impl SynthEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let voices = (0..config.polyphony)
            .map(|i| Voice::new(config.sample_rate, config.voice_seed(i)))
            .collect::<Result<Vec<_>>>()?;
        let parameters = PARAMETERS
            .iter()
            .map(|p| (p.name.to_string(), p.default))
            .collect();
        debug!(
            sample_rate = config.sample_rate,
            polyphony = config.polyphony,
            "synth engine created"
        );

        Ok(Self {
            config,
            voices,
            parameters,
            modulations: Vec::new(),
            receiver: None,
            notes_started: 0,
            last_started: None,
        })
    }

    pub fn with_receiver(mut self, receiver: impl MessageReceiver + Send + 'static) -> Self {
        self.set_receiver(receiver);
        self
    }

    pub fn set_receiver(&mut self, receiver: impl MessageReceiver + Send + 'static) {
        self.receiver = Some(Box::new(receiver));
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    /// Set a named parameter on every voice.
    ///
    /// The value is stored as given; each processor clamps what it reads.
    pub fn set_parameter(&mut self, name: &str, value: f32) -> Result<()> {
        let Some(current) = self.parameters.get_mut(name) else {
            warn!(name, "unknown parameter");
            return Err(Error::UnknownParameter(name.to_string()));
        };
        *current = value;
        for voice in &mut self.voices {
            voice.graph_mut().set_control(name, value)?;
        }
        Ok(())
    }

    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters.get(name).copied()
    }

    pub fn parameters(&self) -> &BTreeMap<String, f32> {
        &self.parameters
    }

    /// Route a named source into a named modulatable parameter on every voice.
    ///
    /// Connecting an existing route again replaces its amount.
    pub fn connect_modulation(&mut self, connection: &ModulationConnection) -> Result<()> {
        if let Err(err) = self.check_route(connection) {
            warn!(%err, "modulation rejected");
            return Err(err);
        }
        // Every voice runs the same patch, so the first one speaks for all.
        if let Some((first, rest)) = self.voices.split_first_mut() {
            if let Err(err) = first.graph_mut().connect(connection) {
                warn!(%err, "modulation rejected");
                return Err(err);
            }
            for voice in rest {
                voice.graph_mut().connect(connection)?;
            }
        }

        let mut stored = connection.clone();
        if !stored.amount.is_finite() {
            stored.amount = 0.0;
        }
        match self.modulations.iter_mut().find(|m| m.same_route(connection)) {
            Some(existing) => existing.amount = stored.amount,
            None => self.modulations.push(stored),
        }
        Ok(())
    }

    /// Remove a route. Returns false, and changes nothing, if it was not there.
    pub fn disconnect_modulation(&mut self, connection: &ModulationConnection) -> bool {
        let Some(index) = self.modulations.iter().position(|m| m.same_route(connection)) else {
            return false;
        };
        self.modulations.remove(index);
        for voice in &mut self.voices {
            voice.graph_mut().disconnect(connection);
        }
        true
    }

    pub fn modulations(&self) -> &[ModulationConnection] {
        &self.modulations
    }

    /// A named modulation source as of the last processed block.
    ///
    /// Reads from the most recently started voice.
    pub fn output(&self, name: &str) -> Result<&Output> {
        let voice = self.last_started.unwrap_or(0);
        self.voices
            .get(voice)
            .and_then(|v| v.graph().output(name))
            .ok_or_else(|| Error::UnknownModulationSource(name.to_string()))
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.voices
            .first()
            .map(|v| v.graph().source_names().collect())
            .unwrap_or_default()
    }

    pub fn active_voice_count(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_free()).count()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn note_on(&mut self, note: u8, velocity: u8, offset: usize) {
        if let Some(stolen) = self.start_note(note, velocity, offset) {
            trace!(note, stolen, "voice stolen");
        }
    }

    pub fn note_off(&mut self, note: u8, offset: usize) {
        if let Some(voice) = self
            .voices
            .iter_mut()
            .find(|v| v.note() == note && v.state() == VoiceState::Active)
        {
            voice.release(offset);
        }
    }

    pub fn all_notes_off(&mut self, offset: usize) {
        for voice in &mut self.voices {
            voice.release(offset);
        }
    }

    /// Render `out.len()` samples, replacing its contents with the voice mix.
    pub fn process(&mut self, out: &mut [f32]) {
        let first_block = out.len().min(MAX_BLOCK_SIZE);
        self.drain_messages(first_block);

        for chunk in out.chunks_mut(MAX_BLOCK_SIZE) {
            let block_size = chunk.len();
            chunk.fill(0.0);

            for voice in &mut self.voices {
                if voice.is_free() {
                    continue;
                }
                voice.render(block_size);
                if let Some(output) = voice.output() {
                    for (o, v) in chunk.iter_mut().zip(&output.buffer[..block_size]) {
                        *o += v;
                    }
                }
            }
        }
    }

    /// The current parameters and modulation routes.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            parameters: self.parameters.clone(),
            modulations: self.modulations.clone(),
        }
    }

    /// Replace the whole synthesis state with `snapshot`.
    ///
    /// Parameters missing from the snapshot fall back to their defaults and
    /// unknown names are skipped. Every voice is reset, so output after a
    /// restore depends only on the snapshot and the engine seed.
    ///
    /// If any modulation route is invalid nothing changes.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        let mut fan_in: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for connection in &snapshot.modulations {
            self.check_route(connection)?;
            let sources = fan_in.entry(connection.destination.as_str()).or_default();
            sources.insert(connection.source.as_str());
            if sources.len() > MAX_MODULATIONS_PER_INPUT {
                return Err(Error::ModulationLimit {
                    destination: connection.destination.clone(),
                    limit: MAX_MODULATIONS_PER_INPUT,
                });
            }
        }

        for (name, _) in snapshot
            .parameters
            .iter()
            .filter(|(name, _)| patch::parameter(name).is_none())
        {
            warn!(name = name.as_str(), "skipping unknown parameter in snapshot");
        }

        self.reset_voices();
        for voice in &mut self.voices {
            voice.graph_mut().clear_modulations();
        }
        self.modulations.clear();

        for param in PARAMETERS {
            let value = snapshot.parameter(param.name).unwrap_or(param.default);
            self.set_parameter(param.name, value)?;
        }
        for connection in &snapshot.modulations {
            self.connect_modulation(connection)?;
        }
        debug!(
            parameters = snapshot.parameters.len(),
            modulations = snapshot.modulations.len(),
            "snapshot restored"
        );
        Ok(())
    }

    /// Silence every voice and return all processor state to its start.
    ///
    /// Parameters and modulation routes are kept.
    pub fn reset(&mut self) {
        self.reset_voices();
        for voice in &mut self.voices {
            for (name, &value) in &self.parameters {
                // Names come from PARAMETERS, which every voice has.
                let result = voice.graph_mut().set_control(name, value);
                debug_assert!(result.is_ok(), "{name}: {result:?}");
            }
        }
    }

    /// Check names without touching any graph.
    fn check_route(&self, connection: &ModulationConnection) -> Result<()> {
        if patch::parameter(&connection.destination).map_or(false, |p| !p.modulatable) {
            return Err(Error::NotModulatable(connection.destination.clone()));
        }
        let Some(voice) = self.voices.first() else {
            return Ok(());
        };
        let graph = voice.graph();
        if graph.output(&connection.source).is_none() {
            return Err(Error::UnknownModulationSource(connection.source.clone()));
        }
        if !graph.destination_names().any(|d| d == connection.destination) {
            return Err(Error::UnknownModulationDestination(
                connection.destination.clone(),
            ));
        }
        Ok(())
    }

    fn reset_voices(&mut self) {
        for voice in &mut self.voices {
            voice.reset();
        }
        self.notes_started = 0;
        self.last_started = None;
    }

    fn drain_messages(&mut self, block_size: usize) {
        let Some(mut receiver) = self.receiver.take() else {
            return;
        };
        let last = block_size.saturating_sub(1);
        while let Some(msg) = receiver.pop() {
            match msg {
                SynthMessage::NoteOn {
                    note,
                    velocity,
                    offset,
                } => {
                    self.start_note(note, velocity, offset.min(last));
                }
                SynthMessage::NoteOff { note, offset } => self.note_off(note, offset.min(last)),
                SynthMessage::AllNotesOff { offset } => self.all_notes_off(offset.min(last)),
            }
        }
        self.receiver = Some(receiver);
    }

    /// Start a note; returns the stolen note, if a sounding voice was taken.
    fn start_note(&mut self, note: u8, velocity: u8, offset: usize) -> Option<u8> {
        let index = self.allocate_voice()?;
        let voice = &mut self.voices[index];
        let stolen = (!voice.is_free()).then(|| voice.note());
        voice.start(note, velocity, offset, self.notes_started);
        self.notes_started += 1;
        self.last_started = Some(index);
        stolen
    }

    fn allocate_voice(&self) -> Option<usize> {
        // First pass: find free voice index
        if let Some(idx) = self.voices.iter().position(|v| v.is_free()) {
            return Some(idx);
        }

        // Then the oldest releasing voice, then the oldest active one
        let oldest = |state: VoiceState| {
            self.voices
                .iter()
                .enumerate()
                .filter(|(_, v)| v.state() == state)
                .min_by_key(|(_, v)| v.age())
                .map(|(idx, _)| idx)
        };
        oldest(VoiceState::Releasing).or_else(|| oldest(VoiceState::Active))
    }
}
