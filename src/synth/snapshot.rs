use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{graph::ModulationConnection, synth::patch::PARAMETERS};

/// Complete restorable engine state: every parameter value plus every
/// modulation connection.
///
/// The encoding is left to the caller; with the `serde` feature this derives
/// `Serialize`/`Deserialize`. Parameters are kept in name order so two
/// snapshots of the same state compare and serialize identically.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub parameters: BTreeMap<String, f32>,
    pub modulations: Vec<ModulationConnection>,
}

impl Snapshot {
    /// Every parameter at its default and no modulation.
    pub fn default_parameters() -> Self {
        Self {
            parameters: PARAMETERS
                .iter()
                .map(|p| (p.name.to_string(), p.default))
                .collect(),
            modulations: Vec::new(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<f32> {
        self.parameters.get(name).copied()
    }

    pub fn with_parameter(mut self, name: &str, value: f32) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }

    pub fn with_modulation(mut self, connection: ModulationConnection) -> Self {
        self.modulations.push(connection);
        self
    }
}
