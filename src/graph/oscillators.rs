use std::ops::Range;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    dsp::{
        clamp_finite,
        unison::{
            detune_ratio, harmonize_enabled, scale_increment, unison_detune, unison_gain,
            unison_voices, PitchDrift,
        },
        wave::{phase_increment, FixedPointWaveTable, Waveform, SCALE_NORMALIZE, SCALE_OUT},
    },
    graph::{
        output::Output,
        processor::{InputSpec, Inputs, Processor},
    },
    MAX_BLOCK_SIZE, MAX_UNISON,
};

/*
Unison Oscillator Bank
======================

Two oscillator slots, each playing up to MAX_UNISON detuned copies of one
band-limited waveform from fixed-point phase accumulators.

Per block, per slot:

    1. base increment  = normalized phase increment * u32::MAX   (every sample)
    2. drift           : every voice's random offset takes one step
    3. ratio(v)        = harmonic(v) + 2^(±cents(v)/1200) + cents(v) * drift(v)
    4. increment(v, i) = base(i) * ratio(v)                      (wrapping)
    5. table(v)        = band chosen from increment(v, first sample)

Per sample, per active voice:

    phase(v) += increment(v, i)
    total    += table(v)[phase(v) + cross_mod]

The slot total is scaled by 1 / (voices/2 + 1). The mixed output is
(slot1 + slot2) * SCALE_OUT; each slot is also published on its own
normalized output so it can drive modulation.

Cross Modulation
----------------

Each slot's phase is offset by the OTHER slot's previous sample times the
cross-mod amount (clamped to [-1, 1]). A full-scale sample at amount 1.0
shifts the phase by half a cycle.

Reset
-----

The reset input carries note-on triggers. When it fires at offset K the block
is rendered in two parts:

    [0, K)  exactly as if nothing happened
    at K    voice 0 -> phase 0, voices 1.. -> seeded random phases,
            drift offsets and cross-mod accumulators -> 0,
            ratios and tables recomputed from sample K
    [K, n)  from the reset state

The reset phases come from a generator re-seeded with the bank's seed on
every reset, so everything after K is independent of what came before.
*/

/// Full-scale phase offset for a normalized cross-mod value of 1.0.
const CROSS_MOD_RANGE: f64 = (1u64 << 31) as f64;

const PHASE_SEED_SALT: u64 = 0x7068_6173_65;

struct SlotControls {
    voices: usize,
    detune: f64,
    harmonize: bool,
    waveform: Waveform,
    gain: f32,
}

struct Slot {
    phases: [u32; MAX_UNISON],
    // Voice-major: voice v's increments start at v * MAX_BLOCK_SIZE.
    increments: Vec<u32>,
    buffers: [&'static [i32]; MAX_UNISON],
    drift: PitchDrift,
    cross_mod: u32,
}

impl Slot {
    fn new(table: &'static FixedPointWaveTable) -> Self {
        Self {
            phases: [0; MAX_UNISON],
            increments: vec![0; MAX_UNISON * MAX_BLOCK_SIZE],
            buffers: [table.band(Waveform::Sine, 0); MAX_UNISON],
            drift: PitchDrift::new(),
            cross_mod: 0,
        }
    }

    fn controls(inputs: &Inputs<'_>, first: usize) -> SlotControls {
        let voices = unison_voices(inputs.first(first + UnisonOscillatorBank::VOICES));
        SlotControls {
            voices,
            detune: unison_detune(inputs.first(first + UnisonOscillatorBank::DETUNE)),
            harmonize: harmonize_enabled(inputs.first(first + UnisonOscillatorBank::HARMONIZE)),
            waveform: Waveform::from_control(inputs.first(first + UnisonOscillatorBank::WAVEFORM)),
            gain: unison_gain(voices),
        }
    }

    fn load_base(&mut self, inputs: &Inputs<'_>, input: usize, block_size: usize) {
        let source = inputs.get(input);
        for (i, increment) in self.increments[..block_size].iter_mut().enumerate() {
            *increment = phase_increment(source.at(i));
        }
    }

    /// Fill voices 1.. from voice 0's increments over `range`.
    fn compute_ratios(&mut self, controls: &SlotControls, range: Range<usize>) {
        let (base, rest) = self.increments.split_at_mut(MAX_BLOCK_SIZE);
        for v in 1..controls.voices {
            let ratio = detune_ratio(
                v,
                controls.voices,
                controls.detune,
                controls.harmonize,
                self.drift.offset(v),
            );
            let row = &mut rest[(v - 1) * MAX_BLOCK_SIZE..v * MAX_BLOCK_SIZE];
            for i in range.clone() {
                row[i] = scale_increment(base[i], ratio);
            }
        }
    }

    /// Tables are chosen once per block from one sample's increments.
    fn prepare_buffers(
        &mut self,
        table: &'static FixedPointWaveTable,
        controls: &SlotControls,
        sample: usize,
    ) {
        for v in 0..controls.voices {
            let increment = self.increments[v * MAX_BLOCK_SIZE + sample];
            self.buffers[v] = table.buffer(controls.waveform, increment);
        }
    }

    fn reset_phases<R: Rng>(&mut self, rng: &mut R) {
        self.phases[0] = 0;
        for phase in self.phases[1..].iter_mut() {
            *phase = rng.gen();
        }
        self.drift.clear();
        self.cross_mod = 0;
    }

    /// Advance every active voice one sample and return the gained fixed-point sum.
    #[inline]
    fn tick(&mut self, i: usize, controls: &SlotControls) -> f32 {
        let mut total: i64 = 0;
        for v in 0..controls.voices {
            let phase = self.phases[v].wrapping_add(self.increments[v * MAX_BLOCK_SIZE + i]);
            self.phases[v] = phase;
            total += FixedPointWaveTable::lookup(self.buffers[v], phase.wrapping_add(self.cross_mod))
                as i64;
        }
        total as f32 * controls.gain
    }
}

#[inline]
fn cross_mod_offset(value: f32) -> u32 {
    (value as f64 * CROSS_MOD_RANGE) as i64 as u32
}

/// Two-slot unison oscillator driven by normalized phase increments.
pub struct UnisonOscillatorBank {
    table: &'static FixedPointWaveTable,
    slots: [Slot; 2],
    seed: u64,
    drift_rng: StdRng,
}

impl UnisonOscillatorBank {
    // Per-slot roles; slot 2's inputs follow slot 1's.
    const PHASE_INC: usize = 0;
    const WAVEFORM: usize = 1;
    const VOICES: usize = 2;
    const DETUNE: usize = 3;
    const HARMONIZE: usize = 4;
    const SLOT_INPUTS: usize = 5;

    pub const OSC_1: usize = 0;
    pub const OSC_2: usize = Self::SLOT_INPUTS;

    pub const OSC_1_PHASE_INC: usize = Self::OSC_1 + Self::PHASE_INC;
    pub const OSC_1_WAVEFORM: usize = Self::OSC_1 + Self::WAVEFORM;
    pub const OSC_1_VOICES: usize = Self::OSC_1 + Self::VOICES;
    pub const OSC_1_DETUNE: usize = Self::OSC_1 + Self::DETUNE;
    pub const OSC_1_HARMONIZE: usize = Self::OSC_1 + Self::HARMONIZE;
    pub const OSC_2_PHASE_INC: usize = Self::OSC_2 + Self::PHASE_INC;
    pub const OSC_2_WAVEFORM: usize = Self::OSC_2 + Self::WAVEFORM;
    pub const OSC_2_VOICES: usize = Self::OSC_2 + Self::VOICES;
    pub const OSC_2_DETUNE: usize = Self::OSC_2 + Self::DETUNE;
    pub const OSC_2_HARMONIZE: usize = Self::OSC_2 + Self::HARMONIZE;
    pub const CROSS_MOD: usize = 2 * Self::SLOT_INPUTS;
    pub const RESET: usize = 2 * Self::SLOT_INPUTS + 1;

    /// Output indices.
    pub const MIX: usize = 0;
    pub const OSC_1_OUT: usize = 1;
    pub const OSC_2_OUT: usize = 2;

    pub fn new(seed: u64) -> Self {
        Self::with_table(FixedPointWaveTable::shared(), seed)
    }

    pub fn with_table(table: &'static FixedPointWaveTable, seed: u64) -> Self {
        Self {
            table,
            slots: [Slot::new(table), Slot::new(table)],
            seed,
            drift_rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Note-on reset: seeded phases, zeroed drift and cross modulation.
    fn reset_voices(&mut self) {
        let mut rng = StdRng::seed_from_u64(self.seed ^ PHASE_SEED_SALT);
        for slot in &mut self.slots {
            slot.reset_phases(&mut rng);
        }
    }

    fn render(
        &mut self,
        inputs: &Inputs<'_>,
        outputs: &mut [Output],
        controls: &[SlotControls; 2],
        range: Range<usize>,
    ) {
        let cross_mod = inputs.get(Self::CROSS_MOD);
        let [one, two] = &mut self.slots;
        let [mix, osc1, osc2] = outputs else {
            return;
        };

        for i in range {
            let amount = clamp_finite(cross_mod.at(i), -1.0, 1.0, 0.0);
            let total1 = one.tick(i, &controls[0]);
            let total2 = two.tick(i, &controls[1]);
            let normalized1 = total1 * SCALE_NORMALIZE;
            let normalized2 = total2 * SCALE_NORMALIZE;

            one.cross_mod = cross_mod_offset(amount * normalized2);
            two.cross_mod = cross_mod_offset(amount * normalized1);

            mix.buffer[i] = (total1 + total2) * SCALE_OUT;
            osc1.buffer[i] = normalized1;
            osc2.buffer[i] = normalized2;
        }
    }

    #[cfg(test)]
    fn voice_increment(&self, slot: usize, voice: usize, sample: usize) -> u32 {
        self.slots[slot].increments[voice * MAX_BLOCK_SIZE + sample]
    }

    #[cfg(test)]
    fn phases(&self, slot: usize) -> [u32; MAX_UNISON] {
        self.slots[slot].phases
    }
}

impl Processor for UnisonOscillatorBank {
    fn name(&self) -> &'static str {
        "unison_oscillators"
    }

    fn inputs(&self) -> &'static [InputSpec] {
        const INPUTS: &[InputSpec] = &[
            InputSpec::fixed("osc_1_phase_inc"),
            InputSpec::fixed("osc_1_waveform"),
            InputSpec::fixed("osc_1_unison_voices"),
            InputSpec::modulatable("osc_1_unison_detune"),
            InputSpec::fixed("osc_1_harmonize"),
            InputSpec::fixed("osc_2_phase_inc"),
            InputSpec::fixed("osc_2_waveform"),
            InputSpec::fixed("osc_2_unison_voices"),
            InputSpec::modulatable("osc_2_unison_detune"),
            InputSpec::fixed("osc_2_harmonize"),
            InputSpec::modulatable("cross_mod"),
            InputSpec::fixed("reset"),
        ];
        INPUTS
    }

    fn num_outputs(&self) -> usize {
        3
    }

    fn process(&mut self, inputs: &Inputs<'_>, outputs: &mut [Output], block_size: usize) {
        let controls = [
            Slot::controls(inputs, Self::OSC_1),
            Slot::controls(inputs, Self::OSC_2),
        ];

        self.slots[0].load_base(inputs, Self::OSC_1_PHASE_INC, block_size);
        self.slots[1].load_base(inputs, Self::OSC_2_PHASE_INC, block_size);

        for (slot, controls) in self.slots.iter_mut().zip(&controls) {
            slot.drift.step(&mut self.drift_rng);
            slot.compute_ratios(controls, 0..block_size);
            slot.prepare_buffers(self.table, controls, 0);
        }

        let reset = inputs.get(Self::RESET);
        let mut start = 0;
        if reset.triggered() {
            let offset = reset.trigger_offset().min(block_size);
            self.render(inputs, outputs, &controls, 0..offset);
            self.reset_voices();

            if offset < block_size {
                for (slot, controls) in self.slots.iter_mut().zip(&controls) {
                    slot.compute_ratios(controls, offset..block_size);
                    slot.prepare_buffers(self.table, controls, offset);
                }
            }
            start = offset;
        }
        self.render(inputs, outputs, &controls, start..block_size);
    }

    fn reset(&mut self) {
        self.slots = [Slot::new(self.table), Slot::new(self.table)];
        self.drift_rng = StdRng::seed_from_u64(self.seed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::output::Trigger;
    use proptest::prelude::*;

    type Bank = UnisonOscillatorBank;

    struct Rig {
        bank: Bank,
        inputs: Vec<Output>,
        outputs: Vec<Output>,
        silence: Output,
    }

    impl Rig {
        fn new(seed: u64) -> Self {
            let mut rig = Self {
                bank: Bank::new(seed),
                inputs: (0..12).map(|_| Output::control()).collect(),
                outputs: (0..3).map(|_| Output::audio()).collect(),
                silence: Output::control(),
            };
            rig.set(Bank::OSC_1_PHASE_INC, 220.0 / 48_000.0);
            rig.set(Bank::OSC_2_PHASE_INC, 331.0 / 48_000.0);
            rig.set(Bank::OSC_1_VOICES, 1.0);
            rig.set(Bank::OSC_2_VOICES, 1.0);
            rig
        }

        fn set(&mut self, input: usize, value: f32) {
            self.inputs[input].fill(value, 1);
        }

        fn run(&mut self, block_size: usize, reset_at: Option<usize>) -> Vec<f32> {
            self.inputs[Bank::RESET].trigger = reset_at.map(|offset| Trigger { offset, value: 1.0 });
            let inputs = Inputs::direct(&self.inputs, &self.silence);
            self.bank.process(&inputs, &mut self.outputs, block_size);
            self.outputs[Bank::MIX].buffer[..block_size].to_vec()
        }

        fn osc1(&self, block_size: usize) -> Vec<f32> {
            self.outputs[Bank::OSC_1_OUT].buffer[..block_size].to_vec()
        }
    }

    #[test]
    fn single_voice_is_the_raw_table() {
        let mut rig = Rig::new(1);
        rig.set(Bank::OSC_1_WAVEFORM, Waveform::DownSaw as usize as f32);
        rig.run(64, None);

        let increment = phase_increment(220.0 / 48_000.0);
        let table = FixedPointWaveTable::shared().buffer(Waveform::DownSaw, increment);
        let mut phase = 0u32;
        for (i, &sample) in rig.osc1(64).iter().enumerate() {
            phase = phase.wrapping_add(increment);
            let expected = (FixedPointWaveTable::lookup(table, phase) as i64) as f32 * 1.0;
            assert_eq!(sample, expected * SCALE_NORMALIZE, "sample {i}");
        }
    }

    #[test]
    fn four_voices_are_scaled_by_a_third() {
        // Zero detune and untouched phases: every voice plays the same sample.
        let mut rig = Rig::new(1);
        rig.set(Bank::OSC_1_VOICES, 4.0);
        rig.run(32, None);

        let increment = phase_increment(220.0 / 48_000.0);
        let table = FixedPointWaveTable::shared().buffer(Waveform::Sine, increment);
        let mut phase = 0u32;
        for &sample in &rig.osc1(32) {
            phase = phase.wrapping_add(increment);
            let sum = 4 * FixedPointWaveTable::lookup(table, phase) as i64;
            assert_eq!(sample, sum as f32 * (1.0 / 3.0) * SCALE_NORMALIZE);
        }
    }

    #[test]
    fn detuned_voices_are_symmetric() {
        let mut rig = Rig::new(3);
        rig.set(Bank::OSC_1_VOICES, 7.0);
        rig.set(Bank::OSC_1_DETUNE, 40.0);
        // Reset zeroes drift, so the ratios after the trigger are exact.
        rig.run(16, Some(0));

        let base = rig.bank.voice_increment(0, 0, 5) as f64;
        for pair in 1..=3 {
            let down = rig.bank.voice_increment(0, 2 * pair - 1, 5) as f64 / base;
            let up = rig.bank.voice_increment(0, 2 * pair, 5) as f64 / base;
            assert!(down < 1.0 && up > 1.0);
            approx::assert_relative_eq!(down.log2(), -up.log2(), epsilon = 1e-6);
        }
    }

    #[test]
    fn harmonize_moves_voices_to_harmonics() {
        let mut rig = Rig::new(3);
        rig.set(Bank::OSC_1_VOICES, 3.0);
        rig.set(Bank::OSC_1_HARMONIZE, 1.0);
        rig.run(16, Some(0));

        let base = rig.bank.voice_increment(0, 0, 0) as f64;
        for v in 1..3 {
            let ratio = rig.bank.voice_increment(0, v, 0) as f64 / base;
            approx::assert_relative_eq!(ratio, v as f64 + 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn reset_splits_the_block() {
        let offset = 40;
        let mut plain = Rig::new(9);
        let mut reset = Rig::new(9);
        for rig in [&mut plain, &mut reset] {
            rig.set(Bank::OSC_1_VOICES, 5.0);
            rig.set(Bank::OSC_1_DETUNE, 20.0);
            rig.set(Bank::OSC_2_VOICES, 3.0);
            rig.set(Bank::CROSS_MOD, 0.3);
            rig.run(128, None);
        }

        let expected = plain.run(128, None);
        let got = reset.run(128, Some(offset));
        assert_eq!(&got[..offset], &expected[..offset]);
        assert_ne!(&got[offset..], &expected[offset..]);
    }

    #[test]
    fn output_after_reset_ignores_history() {
        let offset = 17;
        let mut a = Rig::new(5);
        let mut b = Rig::new(5);
        for rig in [&mut a, &mut b] {
            rig.set(Bank::OSC_1_VOICES, 6.0);
            rig.set(Bank::OSC_1_DETUNE, 35.0);
            rig.set(Bank::OSC_2_VOICES, 4.0);
            rig.set(Bank::CROSS_MOD, 0.5);
        }

        // Different histories: b has run longer and at another pitch.
        a.run(64, None);
        b.set(Bank::OSC_1_PHASE_INC, 0.031);
        for _ in 0..5 {
            b.run(64, None);
        }
        b.set(Bank::OSC_1_PHASE_INC, 220.0 / 48_000.0);

        let from_a = a.run(64, Some(offset));
        let from_b = b.run(64, Some(offset));
        assert_eq!(&from_a[offset..], &from_b[offset..]);
        assert_eq!(a.bank.phases(0), b.bank.phases(0));
    }

    #[test]
    fn reset_seeds_phases() {
        let mut rig = Rig::new(11);
        rig.run(8, Some(8));
        let phases = rig.bank.phases(0);
        assert_eq!(phases[0], 0);
        assert!(phases[1..].iter().any(|&p| p != 0));

        let mut other = Rig::new(12);
        other.run(8, Some(8));
        assert_ne!(other.bank.phases(0), phases);
    }

    #[test]
    fn waveform_index_clamps_to_selectable_range() {
        let render = |waveform: f32| {
            let mut rig = Rig::new(2);
            rig.set(Bank::OSC_1_WAVEFORM, waveform);
            rig.run(64, None);
            rig.osc1(64)
        };

        let last = Waveform::ALL[Waveform::SELECTABLE - 1] as usize as f32;
        assert_eq!(render(1_000.0), render(last));
        assert_eq!(render(Waveform::WhiteNoise as usize as f32), render(last));
        assert_eq!(render(-4.0), render(0.0));
        assert_eq!(render(f32::NAN), render(0.0));
        assert_eq!(render(2.4), render(2.0));
    }

    #[test]
    fn restore_reset_reproduces_output() {
        let mut rig = Rig::new(21);
        rig.set(Bank::OSC_1_VOICES, 8.0);
        rig.set(Bank::OSC_1_DETUNE, 10.0);
        let first = rig.run(256, Some(0));
        rig.run(256, None);

        rig.bank.reset();
        assert_eq!(rig.run(256, Some(0)), first);
    }

    proptest! {
        #[test]
        fn never_emits_non_finite(
            inc1 in prop::num::f32::ANY,
            inc2 in prop::num::f32::ANY,
            voices in prop::num::f32::ANY,
            detune in prop::num::f32::ANY,
            waveform in prop::num::f32::ANY,
            cross_mod in prop::num::f32::ANY,
            harmonize in prop::num::f32::ANY,
            offset in 0usize..80,
        ) {
            let mut rig = Rig::new(4);
            rig.set(Bank::OSC_1_PHASE_INC, inc1);
            rig.set(Bank::OSC_2_PHASE_INC, inc2);
            rig.set(Bank::OSC_1_VOICES, voices);
            rig.set(Bank::OSC_2_VOICES, voices);
            rig.set(Bank::OSC_1_DETUNE, detune);
            rig.set(Bank::OSC_1_WAVEFORM, waveform);
            rig.set(Bank::CROSS_MOD, cross_mod);
            rig.set(Bank::OSC_2_HARMONIZE, harmonize);

            for block in [rig.run(64, None), rig.run(64, Some(offset))] {
                prop_assert!(block.iter().all(|s| s.is_finite()));
                prop_assert!(block.iter().all(|s| s.abs() < 4.0));
            }
        }
    }
}
