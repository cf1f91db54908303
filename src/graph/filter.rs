use crate::{
    dsp::{
        filter::{FilterType, SVFilter},
        midi_to_freq,
    },
    graph::{
        output::Output,
        processor::{InputSpec, Inputs, Processor},
    },
};

/*
Filter Processor
================

Wraps the state-variable filter for use inside a voice graph. Parameters are
read once per block from sample 0 of their inputs:

  audio        signal to filter (audio rate)
  filter_type  index into FilterType::ALL, rounded and clamped
  cutoff       MIDI note number; 60 is middle C (261.6 Hz), every 12 is an
               octave, so modulation moves the cutoff musically
  resonance    filter Q, normally fed through the ResonanceGate
  gain_db      shelf/bell gain, ignored by the non-shelving shapes

Changing the type keeps the integrator state, so a sweep through types
does not click more than the change of response itself.
*/

pub struct Filter {
    filter: SVFilter,
    sample_rate: f32,
}

impl Filter {
    pub const AUDIO: usize = 0;
    pub const FILTER_TYPE: usize = 1;
    pub const CUTOFF: usize = 2;
    pub const RESONANCE: usize = 3;
    pub const GAIN_DB: usize = 4;

    pub fn new(sample_rate: f32) -> Self {
        Self {
            filter: SVFilter::new(FilterType::LowPass),
            sample_rate,
        }
    }
}

impl Processor for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        const INPUTS: &[InputSpec] = &[
            InputSpec::fixed("audio"),
            InputSpec::fixed("filter_type"),
            InputSpec::modulatable("cutoff"),
            InputSpec::modulatable("resonance"),
            InputSpec::modulatable("gain_db"),
        ];
        INPUTS
    }

    fn process(&mut self, inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        self.filter
            .set_type(FilterType::from_control(inputs.first(Self::FILTER_TYPE)));
        // SVFilter clamps cutoff, Q and gain into range, including NaN.
        self.filter
            .set_cutoff(midi_to_freq(inputs.first(Self::CUTOFF)));
        self.filter.set_q(inputs.first(Self::RESONANCE));
        self.filter.set_gain_db(inputs.first(Self::GAIN_DB));

        let audio = inputs.get(Self::AUDIO);
        let out = &mut outputs[0].buffer[..block_size];
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = audio.at(i);
        }
        self.filter.render(out, self.sample_rate);
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn peak(filter_type: FilterType, cutoff_note: f32, freq: f32) -> f32 {
        let mut audio = Output::audio();
        let mut sources = vec![audio.clone(); 5];
        for s in sources.iter_mut().skip(1) {
            *s = Output::control();
        }
        sources[Filter::FILTER_TYPE].fill(filter_type as usize as f32, 1);
        sources[Filter::CUTOFF].fill(cutoff_note, 1);
        sources[Filter::RESONANCE].fill(0.707, 1);

        let silence = Output::control();
        let mut filter = Filter::new(SAMPLE_RATE);
        let mut outputs = [Output::audio()];
        let mut peak = 0.0f32;
        let block = 256;
        for b in 0..16 {
            for i in 0..block {
                let n = (b * block + i) as f32;
                audio.buffer[i] = (TAU * freq * n / SAMPLE_RATE).sin();
            }
            sources[Filter::AUDIO] = audio.clone();
            let inputs = Inputs::direct(&sources, &silence);
            filter.process(&inputs, &mut outputs, block);
            if b >= 8 {
                peak = outputs[0].buffer[..block]
                    .iter()
                    .fold(peak, |acc, &x| acc.max(x.abs()));
            }
        }
        peak
    }

    #[test]
    fn lowpass_cutoff_is_a_note() {
        // Note 57 is 220 Hz.
        assert!(peak(FilterType::LowPass, 57.0, 5_000.0) < 0.05);
        assert!(peak(FilterType::LowPass, 57.0, 50.0) > 0.9);
    }

    #[test]
    fn highpass_removes_lows() {
        assert!(peak(FilterType::HighPass, 100.0, 50.0) < 0.05);
    }

    #[test]
    fn garbage_parameters_stay_finite() {
        let mut sources: Vec<Output> = (0..5).map(|_| Output::control()).collect();
        sources[Filter::AUDIO] = Output::audio();
        sources[Filter::AUDIO].fill(0.5, 64);
        sources[Filter::FILTER_TYPE].fill(f32::NAN, 1);
        sources[Filter::CUTOFF].fill(f32::INFINITY, 1);
        sources[Filter::RESONANCE].fill(-3.0, 1);
        sources[Filter::GAIN_DB].fill(1e9, 1);

        let silence = Output::control();
        let inputs = Inputs::direct(&sources, &silence);
        let mut filter = Filter::new(SAMPLE_RATE);
        let mut outputs = [Output::audio()];
        filter.process(&inputs, &mut outputs, 64);
        assert!(outputs[0].buffer[..64].iter().all(|s| s.is_finite()));
    }
}
