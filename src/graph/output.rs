use crate::MAX_BLOCK_SIZE;

/// How much of an [`Output`] buffer carries information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    /// Every sample of the block is meaningful.
    Audio,
    /// Only sample 0 is meaningful; the value holds for the whole block.
    Control,
}

/// A discrete event inside a block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trigger {
    /// Sample index within the block where the event happens.
    pub offset: usize,
    pub value: f32,
}

/// A sample buffer owned and written by exactly one processor.
#[derive(Debug, Clone)]
pub struct Output {
    pub buffer: Box<[f32]>,
    pub rate: Rate,
    /// Set by the owner for the block in which an event occurred.
    pub trigger: Option<Trigger>,
}

impl Output {
    pub fn new(rate: Rate) -> Self {
        Self {
            buffer: vec![0.0; MAX_BLOCK_SIZE].into_boxed_slice(),
            rate,
            trigger: None,
        }
    }

    pub fn audio() -> Self {
        Self::new(Rate::Audio)
    }

    pub fn control() -> Self {
        Self::new(Rate::Control)
    }

    /// Sample `index` as a consumer sees it: control-rate outputs repeat sample 0.
    #[inline]
    pub fn at(&self, index: usize) -> f32 {
        match self.rate {
            Rate::Audio => self.buffer[index],
            Rate::Control => self.buffer[0],
        }
    }

    #[inline]
    pub fn first(&self) -> f32 {
        self.buffer[0]
    }

    #[inline]
    pub fn triggered(&self) -> bool {
        self.trigger.is_some()
    }

    /// Offset of this block's event, or 0 when nothing triggered.
    #[inline]
    pub fn trigger_offset(&self) -> usize {
        self.trigger.map_or(0, |t| t.offset)
    }

    /// Write `value` as this output's whole-block result.
    pub fn fill(&mut self, value: f32, block_size: usize) {
        match self.rate {
            Rate::Audio => self.buffer[..block_size].fill(value),
            Rate::Control => self.buffer[0] = value,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.trigger = None;
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::audio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_rate_repeats_first_sample() {
        let mut out = Output::control();
        out.fill(0.25, 64);
        out.buffer[10] = 9.0;
        assert_eq!(out.at(0), 0.25);
        assert_eq!(out.at(10), 0.25);
    }

    #[test]
    fn audio_rate_reads_each_sample() {
        let mut out = Output::audio();
        out.fill(0.5, 4);
        out.buffer[2] = -1.0;
        assert_eq!(out.at(1), 0.5);
        assert_eq!(out.at(2), -1.0);
        assert_eq!(out.at(4), 0.0);
    }

    #[test]
    fn trigger_offset_defaults_to_zero() {
        let mut out = Output::control();
        assert!(!out.triggered());
        assert_eq!(out.trigger_offset(), 0);

        out.trigger = Some(Trigger {
            offset: 17,
            value: 1.0,
        });
        assert!(out.triggered());
        assert_eq!(out.trigger_offset(), 17);

        out.clear();
        assert!(!out.triggered());
    }
}
