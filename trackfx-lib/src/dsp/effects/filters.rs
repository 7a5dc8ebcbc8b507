//! One-pole filters used inside feedback paths.

use std::f32::consts::PI;

fn rc_and_dt(cutoff_hz: f32, sample_rate: u32) -> (f32, f32) {
    let rc = 1.0 / (2.0 * PI * cutoff_hz.max(1.0));
    let dt = 1.0 / sample_rate.max(1) as f32;
    (rc, dt)
}

/// First-order low-pass: `y = y1 + a * (x - y1)`.
#[derive(Clone, Debug)]
pub(super) struct OnePoleLowPass {
    alpha: f32,
    y1: f32,
}

impl OnePoleLowPass {
    pub(super) fn new(cutoff_hz: f32, sample_rate: u32) -> Self {
        let mut filter = Self { alpha: 1.0, y1: 0.0 };
        filter.set_cutoff(cutoff_hz, sample_rate);
        filter
    }

    /// Recompute the coefficient, keeping filter memory.
    pub(super) fn set_cutoff(&mut self, cutoff_hz: f32, sample_rate: u32) {
        let (rc, dt) = rc_and_dt(cutoff_hz, sample_rate);
        self.alpha = dt / (rc + dt);
    }

    #[inline]
    pub(super) fn process(&mut self, x: f32) -> f32 {
        self.y1 += self.alpha * (x - self.y1);
        self.y1
    }

    pub(super) fn reset(&mut self) {
        self.y1 = 0.0;
    }
}

/// First-order high-pass: `y = a * (y1 + x - x1)`.
#[derive(Clone, Debug)]
pub(super) struct OnePoleHighPass {
    alpha: f32,
    x1: f32,
    y1: f32,
}

impl OnePoleHighPass {
    pub(super) fn new(cutoff_hz: f32, sample_rate: u32) -> Self {
        let mut filter = Self {
            alpha: 1.0,
            x1: 0.0,
            y1: 0.0,
        };
        filter.set_cutoff(cutoff_hz, sample_rate);
        filter
    }

    /// Recompute the coefficient, keeping filter memory.
    pub(super) fn set_cutoff(&mut self, cutoff_hz: f32, sample_rate: u32) {
        let (rc, dt) = rc_and_dt(cutoff_hz, sample_rate);
        self.alpha = rc / (rc + dt);
    }

    #[inline]
    pub(super) fn process(&mut self, x: f32) -> f32 {
        let y = self.alpha * (self.y1 + x - self.x1);
        self.x1 = x;
        self.y1 = y;
        y
    }

    pub(super) fn reset(&mut self) {
        self.x1 = 0.0;
        self.y1 = 0.0;
    }
}
