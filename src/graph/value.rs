use crate::graph::{
    output::{Output, Rate, Trigger},
    processor::{InputSpec, Inputs, Processor},
};

/// A named control: a constant the control thread can change between blocks.
pub struct Value {
    value: f32,
    initial: f32,
}

impl Value {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            initial: value,
        }
    }

    pub fn value(&self) -> f32 {
        self.value
    }
}

impl Processor for Value {
    fn name(&self) -> &'static str {
        "value"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        &[]
    }

    fn rate(&self) -> Rate {
        Rate::Control
    }

    fn process(&mut self, _inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        outputs[0].fill(self.value, block_size);
    }

    fn reset(&mut self) {
        self.value = self.initial;
    }

    fn set_value(&mut self, value: f32) {
        // Stored raw; consumers clamp.
        self.value = value;
    }
}

/// Publishes scheduled events (note on, note off) for exactly one block.
///
/// The output's first sample holds the value of the most recent event so
/// consumers can also read it as a level.
pub struct TriggerSource {
    pending: Option<Trigger>,
    level: f32,
}

impl TriggerSource {
    pub fn new() -> Self {
        Self {
            pending: None,
            level: 0.0,
        }
    }
}

impl Default for TriggerSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for TriggerSource {
    fn name(&self) -> &'static str {
        "trigger"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        &[]
    }

    fn rate(&self) -> Rate {
        Rate::Control
    }

    fn process(&mut self, _inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        let out = &mut outputs[0];
        if let Some(mut trigger) = self.pending.take() {
            trigger.offset = trigger.offset.min(block_size.saturating_sub(1));
            self.level = trigger.value;
            out.trigger = Some(trigger);
        }
        out.fill(self.level, block_size);
    }

    fn reset(&mut self) {
        self.pending = None;
        self.level = 0.0;
    }

    /// A second event in the same block replaces the first.
    fn schedule(&mut self, trigger: Trigger) {
        self.pending = Some(trigger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(processor: &mut dyn Processor, outputs: &mut [Output], block_size: usize) {
        let silence = Output::control();
        let inputs = Inputs::direct(&[], &silence);
        for out in outputs.iter_mut() {
            out.trigger = None;
        }
        processor.process(&inputs, outputs, block_size);
    }

    #[test]
    fn value_writes_its_constant() {
        let mut value = Value::new(0.3);
        let mut outputs = [Output::control()];
        run(&mut value, &mut outputs, 64);
        assert_eq!(outputs[0].first(), 0.3);

        value.set_value(-2.0);
        run(&mut value, &mut outputs, 64);
        assert_eq!(outputs[0].at(63), -2.0);

        value.reset();
        assert_eq!(value.value(), 0.3);
    }

    #[test]
    fn trigger_lasts_one_block() {
        let mut source = TriggerSource::new();
        let mut outputs = [Output::control()];

        source.schedule(Trigger {
            offset: 12,
            value: 1.0,
        });
        run(&mut source, &mut outputs, 64);
        assert!(outputs[0].triggered());
        assert_eq!(outputs[0].trigger_offset(), 12);
        assert_eq!(outputs[0].first(), 1.0);

        run(&mut source, &mut outputs, 64);
        assert!(!outputs[0].triggered());
        assert_eq!(outputs[0].first(), 1.0);
    }

    #[test]
    fn trigger_offset_is_clamped_into_block() {
        let mut source = TriggerSource::new();
        let mut outputs = [Output::control()];
        source.schedule(Trigger {
            offset: 500,
            value: 1.0,
        });
        run(&mut source, &mut outputs, 32);
        assert_eq!(outputs[0].trigger_offset(), 31);
    }
}
