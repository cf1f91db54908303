use std::collections::BTreeMap;

use petgraph::{
    algo::toposort,
    graph::{DiGraph, NodeIndex},
};
use tracing::debug;

use crate::{
    error::{Error, Result},
    graph::{
        modulation::{ModulationConnection, ModulationSum, MAX_MODULATIONS_PER_INPUT},
        output::{Output, Trigger},
        processor::{Inputs, OutputId, Processor, ProcessorId},
        value::{TriggerSource, Value},
    },
    MAX_BLOCK_SIZE,
};

/*
Graph Engine
============

The graph is an arena: processors live in a Vec and are addressed by index,
their outputs live in a parallel Vec, and an input binding is just an
OutputId (processor index + output index). Nothing holds a reference to
another processor, so there are no ownership cycles to untangle.

Evaluation order is a topological sort of the binding edges, recomputed on
the control thread whenever the topology changes and stored as a plain list
of indices. process() walks that list once per block:

    for each processor in order:
        1. evaluate its modulation sums (base + Σ amount * source)
        2. move its outputs out of the arena
        3. run process() against the arena (its dependencies are done)
        4. move the outputs back

Step 2 is what makes a processor's writes and its reads disjoint: it can
read any other output in the arena while holding its own mutably, and no
buffer is ever copied.

Cycles
------

A cycle of plain bindings is rejected when it is made, and the binding is
rolled back. Modulation edges are allowed to close a loop. The sort first
tries to honor them too; if they create a cycle it falls back to the binding
edges alone, and whichever side runs later simply reads the other's previous
block.
*/

struct Node {
    processor: Box<dyn Processor>,
    bindings: Vec<Option<OutputId>>,
    modulated: Vec<Option<ModulationSum>>,
}

/// Where a named modulation destination lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Destination {
    processor: ProcessorId,
    input: usize,
}

pub struct Graph {
    nodes: Vec<Node>,
    outputs: Vec<Vec<Output>>,
    order: Vec<usize>,
    silence: Output,

    controls: BTreeMap<String, ProcessorId>,
    triggers: BTreeMap<String, ProcessorId>,
    sources: BTreeMap<String, OutputId>,
    destinations: BTreeMap<String, Destination>,
    modulations: Vec<ModulationConnection>,
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            outputs: Vec::new(),
            order: Vec::new(),
            silence: Output::control(),
            controls: BTreeMap::new(),
            triggers: BTreeMap::new(),
            sources: BTreeMap::new(),
            destinations: BTreeMap::new(),
            modulations: Vec::new(),
        }
    }

    /// Add a processor with all inputs unbound.
    pub fn add(&mut self, processor: impl Processor + 'static) -> ProcessorId {
        let rate = processor.rate();
        let outputs = (0..processor.num_outputs())
            .map(|_| Output::new(rate))
            .collect();
        let num_inputs = processor.inputs().len();

        let id = ProcessorId(self.nodes.len());
        self.nodes.push(Node {
            processor: Box::new(processor),
            bindings: vec![None; num_inputs],
            modulated: (0..num_inputs).map(|_| None).collect(),
        });
        self.outputs.push(outputs);
        // A new node has no edges, so it can run first.
        self.order.insert(0, id.0);
        id
    }

    /// Add a named control holding `value`.
    pub fn add_control(&mut self, name: &str, value: f32) -> Result<ProcessorId> {
        if self.controls.contains_key(name) || self.triggers.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let id = self.add(Value::new(value));
        self.controls.insert(name.to_string(), id);
        Ok(id)
    }

    /// Add a named trigger source.
    pub fn add_trigger(&mut self, name: &str) -> Result<ProcessorId> {
        if self.controls.contains_key(name) || self.triggers.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let id = self.add(TriggerSource::new());
        self.triggers.insert(name.to_string(), id);
        Ok(id)
    }

    /// Bind `source` to input `input` of `processor`.
    ///
    /// Fails without changing anything if the binding would close a cycle.
    pub fn plug(&mut self, source: OutputId, processor: ProcessorId, input: usize) -> Result<()> {
        self.check_input(processor, input)?;
        if self.outputs.get(source.processor.0).map_or(true, |o| source.index >= o.len()) {
            return Err(Error::InvalidInput {
                processor: source.processor.0,
                input: source.index,
            });
        }

        let previous = self.nodes[processor.0].bindings[input].replace(source);
        match self.sort() {
            Some(order) => {
                self.order = order;
                Ok(())
            }
            None => {
                self.nodes[processor.0].bindings[input] = previous;
                let err = Error::Cycle {
                    from: self.label(source.processor),
                    to: self.label(processor),
                };
                debug!(%err, "rejected binding");
                Err(err)
            }
        }
    }

    /// Publish output `output` under `name` as a modulation source.
    pub fn expose_source(&mut self, name: &str, output: OutputId) -> Result<()> {
        if self.sources.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        if self.outputs.get(output.processor.0).map_or(true, |o| output.index >= o.len()) {
            return Err(Error::InvalidInput {
                processor: output.processor.0,
                input: output.index,
            });
        }
        self.sources.insert(name.to_string(), output);
        Ok(())
    }

    /// Publish input `input` of `processor` under `name` as a modulation destination.
    pub fn expose_destination(
        &mut self,
        name: &str,
        processor: ProcessorId,
        input: usize,
    ) -> Result<()> {
        self.check_input(processor, input)?;
        if !self.nodes[processor.0].processor.inputs()[input].modulatable {
            return Err(Error::NotModulatable(name.to_string()));
        }
        if self.destinations.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        self.destinations
            .insert(name.to_string(), Destination { processor, input });
        Ok(())
    }

    /// Set the named control's value for the following blocks.
    pub fn set_control(&mut self, name: &str, value: f32) -> Result<()> {
        let id = self
            .controls
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        self.nodes[id.0].processor.set_value(value);
        Ok(())
    }

    /// Queue an event on the named trigger source for the next block.
    pub fn schedule(&mut self, name: &str, trigger: Trigger) -> Result<()> {
        let id = self
            .triggers
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))?;
        self.nodes[id.0].processor.schedule(trigger);
        Ok(())
    }

    /// Add a modulation connection, or update the amount of an existing route.
    pub fn connect(&mut self, connection: &ModulationConnection) -> Result<()> {
        let source = *self
            .sources
            .get(&connection.source)
            .ok_or_else(|| Error::UnknownModulationSource(connection.source.clone()))?;
        let destination = *self
            .destinations
            .get(&connection.destination)
            .ok_or_else(|| Error::UnknownModulationDestination(connection.destination.clone()))?;
        let amount = if connection.amount.is_finite() {
            connection.amount
        } else {
            0.0
        };

        let slot = &mut self.nodes[destination.processor.0].modulated[destination.input];
        let sum = slot.get_or_insert_with(ModulationSum::new);
        let accepted = sum.set(source, amount);
        let empty = sum.is_empty();
        if !accepted {
            if empty {
                *slot = None;
            }
            return Err(Error::ModulationLimit {
                destination: connection.destination.clone(),
                limit: MAX_MODULATIONS_PER_INPUT,
            });
        }

        match self.modulations.iter_mut().find(|m| m.same_route(connection)) {
            Some(existing) => existing.amount = amount,
            None => {
                self.modulations.push(ModulationConnection {
                    amount,
                    ..connection.clone()
                });
                if let Some(order) = self.sort() {
                    self.order = order;
                }
            }
        }
        debug!(
            source = %connection.source,
            destination = %connection.destination,
            amount,
            "modulation connected"
        );
        Ok(())
    }

    /// Remove a modulation route. Returns false if it was not connected.
    pub fn disconnect(&mut self, connection: &ModulationConnection) -> bool {
        let Some(position) = self
            .modulations
            .iter()
            .position(|m| m.same_route(connection))
        else {
            return false;
        };
        self.modulations.remove(position);

        if let (Some(&source), Some(&destination)) = (
            self.sources.get(&connection.source),
            self.destinations.get(&connection.destination),
        ) {
            let slot = &mut self.nodes[destination.processor.0].modulated[destination.input];
            let empty = match slot {
                Some(sum) => {
                    sum.remove(source);
                    sum.is_empty()
                }
                None => false,
            };
            if empty {
                *slot = None;
            }
        }
        if let Some(order) = self.sort() {
            self.order = order;
        }
        debug!(
            source = %connection.source,
            destination = %connection.destination,
            "modulation disconnected"
        );
        true
    }

    /// Drop every modulation connection.
    pub fn clear_modulations(&mut self) {
        for node in &mut self.nodes {
            for slot in &mut node.modulated {
                *slot = None;
            }
        }
        self.modulations.clear();
        if let Some(order) = self.sort() {
            self.order = order;
        }
    }

    pub fn modulations(&self) -> &[ModulationConnection] {
        &self.modulations
    }

    /// Named modulation source output, as of the last processed block.
    pub fn output(&self, name: &str) -> Option<&Output> {
        self.sources.get(name).and_then(|&id| self.output_of(id))
    }

    pub fn output_of(&self, id: OutputId) -> Option<&Output> {
        self.outputs.get(id.processor.0)?.get(id.index)
    }

    pub fn has_control(&self, name: &str) -> bool {
        self.controls.contains_key(name)
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn destination_names(&self) -> impl Iterator<Item = &str> {
        self.destinations.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Current evaluation order.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Run every processor once, in dependency order.
    ///
    /// Blocks larger than `MAX_BLOCK_SIZE` are truncated.
    pub fn process(&mut self, block_size: usize) {
        let block_size = block_size.min(MAX_BLOCK_SIZE);
        if block_size == 0 {
            return;
        }

        let Graph {
            nodes,
            outputs,
            order,
            silence,
            ..
        } = self;
        let silence: &Output = silence;

        for &index in order.iter() {
            let node = &mut nodes[index];

            for (input, slot) in node.modulated.iter_mut().enumerate() {
                if let Some(sum) = slot {
                    let base = node.bindings[input]
                        .and_then(|id| outputs.get(id.processor.0)?.get(id.index))
                        .unwrap_or(silence);
                    sum.compute(base, outputs, silence, block_size);
                }
            }

            let mut own = std::mem::take(&mut outputs[index]);
            for out in own.iter_mut() {
                out.trigger = None;
            }
            let inputs = Inputs::graph(outputs, &node.bindings, &node.modulated, silence);
            node.processor.process(&inputs, &mut own, block_size);
            outputs[index] = own;
        }
    }

    /// Return every processor and output to its initial state.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.processor.reset();
        }
        for outputs in &mut self.outputs {
            for out in outputs.iter_mut() {
                out.clear();
            }
        }
    }

    fn check_input(&self, processor: ProcessorId, input: usize) -> Result<()> {
        match self.nodes.get(processor.0) {
            Some(node) if input < node.bindings.len() => Ok(()),
            _ => Err(Error::InvalidInput {
                processor: processor.0,
                input,
            }),
        }
    }

    fn label(&self, id: ProcessorId) -> String {
        let name = self
            .nodes
            .get(id.0)
            .map_or("unknown", |node| node.processor.name());
        format!("{name}#{}", id.0)
    }

    /// Topological order over bindings, honoring modulation edges when they
    /// do not close a cycle. `None` if the bindings alone are cyclic.
    fn sort(&self) -> Option<Vec<usize>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.nodes.len(), 0);
        let indices: Vec<NodeIndex> = (0..self.nodes.len()).map(|i| graph.add_node(i)).collect();

        for (i, node) in self.nodes.iter().enumerate() {
            for source in node.bindings.iter().flatten() {
                graph.add_edge(indices[source.processor.0], indices[i], ());
            }
        }

        let hard = match toposort(&graph, None) {
            Ok(order) => order,
            Err(_) => return None,
        };

        let mut soft = graph.clone();
        for (i, node) in self.nodes.iter().enumerate() {
            for sum in node.modulated.iter().flatten() {
                for source in sum.source_ids() {
                    soft.add_edge(indices[source.processor.0], indices[i], ());
                }
            }
        }

        let order = match toposort(&soft, None) {
            Ok(order) => order,
            Err(_) => {
                debug!("modulation loop, falling back to one block of latency");
                hard
            }
        };
        Some(order.into_iter().map(|idx| graph[idx]).collect())
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
