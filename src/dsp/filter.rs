use std::f32::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/*
| type              | passes          | rejects      | uses gain |
| ----------------- | --------------- | ------------ | --------- |
| low-pass          | below cutoff    | above cutoff | no        |
| high-pass         | above cutoff    | below cutoff | no        |
| band-pass         | around cutoff   | outside      | no        |
| notch             | outside         | at cutoff    | no        |
| low-shelf         | everything      | -            | below     |
| high-shelf        | everything      | -            | above     |
| band-shelf (bell) | everything      | -            | around    |
| all-pass          | everything      | -            | no        |

All eight responses come from the same two-integrator TPT core. One sample
through the core yields a band-pass (v1) and a low-pass (v2) state; each
response is a linear mix of the input and those two:

    out = m0 * input + m1 * v1 + m2 * v2

Shelves additionally warp the integrator gain by sqrt(A) where
A = 10^(gain_db / 40), which keeps the shelf midpoint at the cutoff.

Resonance is the filter Q (k = 1 / Q). For the shelving shapes Q only sets the
slope of the transition, which is why the graph routes resonance through a
gate that pins it to 1.0 for those shapes.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    LowPass,
    HighPass,
    BandPass,
    Notch,
    LowShelf,
    HighShelf,
    BandShelf,
    AllPass,
}

impl FilterType {
    pub const ALL: [FilterType; 8] = [
        FilterType::LowPass,
        FilterType::HighPass,
        FilterType::BandPass,
        FilterType::Notch,
        FilterType::LowShelf,
        FilterType::HighShelf,
        FilterType::BandShelf,
        FilterType::AllPass,
    ];

    /// Filter type for a raw control value, truncated toward zero and clamped
    /// to the valid range. NaN selects [`FilterType::LowPass`].
    pub fn from_control(value: f32) -> Self {
        // `as` truncates, saturates infinities and sends NaN to 0.
        let index = (value as i32).clamp(0, Self::ALL.len() as i32 - 1);
        Self::ALL[index as usize]
    }

    /// Shelving shapes plateau instead of peaking; resonance has no effect on them.
    pub fn is_shelf(self) -> bool {
        matches!(
            self,
            FilterType::LowShelf | FilterType::HighShelf | FilterType::BandShelf
        )
    }
}

pub const MIN_CUTOFF_HZ: f32 = 20.0;
pub const MIN_Q: f32 = 0.1;
pub const MAX_Q: f32 = 40.0;
pub const MAX_SHELF_DB: f32 = 24.0;

/// Per-block coefficients for the TPT core.
#[derive(Debug, Clone, Copy)]
pub struct Coefficients {
    g: f32,
    k: f32,
    m0: f32,
    m1: f32,
    m2: f32,
}

pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    pub cutoff_hz: f32,
    pub q: f32,
    pub gain_db: f32,
    filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType) -> Self {
        Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz: 1000.0,
            q: std::f32::consts::FRAC_1_SQRT_2,
            gain_db: 0.0,
            filter_type,
        }
    }

    pub fn lowpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            ..Self::new(FilterType::LowPass)
        }
    }

    pub fn highpass(cutoff_hz: f32) -> Self {
        Self {
            cutoff_hz,
            ..Self::new(FilterType::HighPass)
        }
    }

    pub fn coefficients(&self, sample_rate: f32) -> Coefficients {
        let nyquist_guard = sample_rate * 0.49;
        let cutoff = super::clamp_finite(self.cutoff_hz, MIN_CUTOFF_HZ, nyquist_guard, 1000.0);
        let q = super::clamp_finite(self.q, MIN_Q, MAX_Q, 1.0);
        let gain_db = super::clamp_finite(self.gain_db, -MAX_SHELF_DB, MAX_SHELF_DB, 0.0);

        let g = (PI * cutoff / sample_rate).tan();
        let k = 1.0 / q;
        let a = 10.0_f32.powf(gain_db / 40.0);

        let (g, k, m0, m1, m2) = match self.filter_type {
            FilterType::LowPass => (g, k, 0.0, 0.0, 1.0),
            FilterType::HighPass => (g, k, 1.0, -k, -1.0),
            FilterType::BandPass => (g, k, 0.0, 1.0, 0.0),
            FilterType::Notch => (g, k, 1.0, -k, 0.0),
            FilterType::AllPass => (g, k, 1.0, -2.0 * k, 0.0),
            FilterType::LowShelf => (g / a.sqrt(), k, 1.0, k * (a - 1.0), a * a - 1.0),
            FilterType::HighShelf => (g * a.sqrt(), k, a * a, k * (1.0 - a) * a, 1.0 - a * a),
            FilterType::BandShelf => {
                let k = 1.0 / (q * a);
                (g, k, 1.0, k * (a * a - 1.0), 0.0)
            }
        };

        Coefficients { g, k, m0, m1, m2 }
    }

    #[inline]
    pub fn next_sample(&mut self, sample: f32, c: &Coefficients) -> f32 {
        let h = 1.0 / (1.0 + c.g * (c.g + c.k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + c.g * v3);
        let v2 = self.ic2eq + c.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        c.m0 * sample + c.m1 * v1 + c.m2 * v2
    }

    /// Filter `buffer` in place.
    pub fn render(&mut self, buffer: &mut [f32], sample_rate: f32) {
        let c = self.coefficients(sample_rate);

        for sample in buffer.iter_mut() {
            *sample = self.next_sample(*sample, &c);
        }

        // A non-finite input poisons the integrators; recover rather than ring forever.
        if !(self.ic1eq.is_finite() && self.ic2eq.is_finite()) {
            self.reset();
            buffer.fill(0.0);
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }

    pub fn set_type(&mut self, filter_type: FilterType) {
        self.filter_type = filter_type;
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn set_cutoff(&mut self, cutoff: f32) {
        self.cutoff_hz = cutoff;
    }

    pub fn set_q(&mut self, q: f32) {
        self.q = q;
    }

    pub fn set_gain_db(&mut self, gain_db: f32) {
        self.gain_db = gain_db;
    }
}
