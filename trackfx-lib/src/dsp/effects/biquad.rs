//! Mono peaking biquad used by the equalizer bands.

use std::f32::consts::PI;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) struct BiquadCoefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl BiquadCoefficients {
    /// RBJ peaking EQ design.
    ///
    /// `freq_hz` is limited below Nyquist so the design stays stable at low
    /// sample rates.
    pub(super) fn peaking(sample_rate: u32, freq_hz: f32, q: f32, gain_db: f32) -> Self {
        let sample_rate = sample_rate.max(1) as f32;
        let nyquist = sample_rate / 2.0;
        let freq_hz = freq_hz.clamp(1.0, (nyquist * 0.99).max(1.0));
        let w0 = 2.0 * PI * freq_hz / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q.max(f32::EPSILON));
        let amplitude = 10.0_f32.powf(gain_db / 40.0);

        let b0 = 1.0 + alpha * amplitude;
        let b1 = -2.0 * cos_w0;
        let b2 = 1.0 - alpha * amplitude;
        let a0 = 1.0 + alpha / amplitude;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha / amplitude;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

#[derive(Clone, Debug)]
pub(super) struct Biquad {
    coeffs: BiquadCoefficients,
    x_n1: f32,
    x_n2: f32,
    y_n1: f32,
    y_n2: f32,
}

impl Biquad {
    pub(super) fn new(coeffs: BiquadCoefficients) -> Self {
        Self {
            coeffs,
            x_n1: 0.0,
            x_n2: 0.0,
            y_n1: 0.0,
            y_n2: 0.0,
        }
    }

    /// Swap coefficients without clearing the filter memory.
    pub(super) fn set_coefficients(&mut self, coeffs: BiquadCoefficients) {
        self.coeffs = coeffs;
    }

    /// Filter a block in place.
    pub(super) fn process_block(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let x = *sample;
            let y = self.coeffs.b0 * x + self.coeffs.b1 * self.x_n1 + self.coeffs.b2 * self.x_n2
                - self.coeffs.a1 * self.y_n1
                - self.coeffs.a2 * self.y_n2;

            self.x_n2 = self.x_n1;
            self.x_n1 = x;
            self.y_n2 = self.y_n1;
            self.y_n1 = y;
            *sample = y;
        }
    }

    pub(super) fn reset(&mut self) {
        self.x_n1 = 0.0;
        self.x_n2 = 0.0;
        self.y_n1 = 0.0;
        self.y_n2 = 0.0;
    }
}
