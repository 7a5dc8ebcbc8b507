//! Feedback delay with filtered repeats and an optional ping-pong stereo mode.
//!
//! The delay line is a fixed-size ring buffer holding exactly
//! `delay_time_ms * sample_rate / 1000` samples, so the slot about to be
//! overwritten is always the sample written one delay-time ago. Repeats are
//! shaped by a one-pole high-pass (`low_cut`) and low-pass (`high_cut`) in the
//! feedback path only; the first repeat reaches the output unfiltered.

use dasp_ring_buffer::Fixed;
use log::debug;
use serde::{Deserialize, Serialize};

use super::filters::{OnePoleHighPass, OnePoleLowPass};
use super::params::{changed, merge_clamped};
use super::{sanitize_sample_rate, Effect, ParamRange, ParameterMap, DEFAULT_SAMPLE_RATE};
use crate::error::EffectError;

pub const DELAY_TIME_MS: ParamRange = ParamRange::new(1.0, 2_000.0, 300.0);
pub const FEEDBACK: ParamRange = ParamRange::new(0.0, 0.95, 0.35);
pub const MIX: ParamRange = ParamRange::new(0.0, 1.0, 0.5);
pub const LOW_CUT_HZ: ParamRange = ParamRange::new(20.0, 2_000.0, 80.0);
pub const HIGH_CUT_HZ: ParamRange = ParamRange::new(1_000.0, 20_000.0, 12_000.0);
pub const PING_PONG: ParamRange = ParamRange::new(0.0, 1.0, 0.0);

fn range_of(name: &str) -> Option<ParamRange> {
    match name {
        "delay_time_ms" => Some(DELAY_TIME_MS),
        "feedback" => Some(FEEDBACK),
        "mix" => Some(MIX),
        "low_cut" => Some(LOW_CUT_HZ),
        "high_cut" => Some(HIGH_CUT_HZ),
        "ping_pong" => Some(PING_PONG),
        _ => None,
    }
}

/// Delay parameters. Every field lies inside its declared range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelaySettings {
    pub delay_time_ms: f32,
    pub feedback: f32,
    pub mix: f32,
    pub low_cut: f32,
    pub high_cut: f32,
    pub ping_pong: f32,
}

impl Default for DelaySettings {
    fn default() -> Self {
        Self {
            delay_time_ms: DELAY_TIME_MS.default,
            feedback: FEEDBACK.default,
            mix: MIX.default,
            low_cut: LOW_CUT_HZ.default,
            high_cut: HIGH_CUT_HZ.default,
            ping_pong: PING_PONG.default,
        }
    }
}

/// Feedback delay effect with runtime state.
#[derive(Clone)]
pub struct Delay {
    sample_rate: u32,
    settings: DelaySettings,
    left: DelayLine,
    right: DelayLine,
}

impl std::fmt::Debug for Delay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delay")
            .field("sample_rate", &self.sample_rate)
            .field("settings", &self.settings)
            .field("delay_samples", &self.delay_samples())
            .finish()
    }
}

impl Default for Delay {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl Delay {
    /// Create a delay with default parameters bound to `sample_rate`.
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sanitize_sample_rate(sample_rate);
        let settings = DelaySettings::default();
        Self {
            sample_rate,
            settings,
            left: DelayLine::new(&settings, sample_rate),
            right: DelayLine::new(&settings, sample_rate),
        }
    }

    /// Create a delay and merge `params` into the defaults.
    pub fn with_parameters(sample_rate: u32, params: &ParameterMap) -> Self {
        let mut delay = Self::new(sample_rate);
        delay.set_parameters(params);
        delay
    }

    /// Current parameter values.
    pub fn settings(&self) -> DelaySettings {
        self.settings
    }

    /// Length of the delay line in samples.
    pub fn delay_samples(&self) -> usize {
        self.left.len()
    }

    /// Process a stereo block.
    ///
    /// Unlike [`Effect::apply`], this honours `ping_pong`: each channel's
    /// repeats are fed back partly (or, at 1.0, entirely) into the opposite
    /// channel.
    ///
    /// # Returns
    /// The processed `(left, right)` pair, or `InvalidInput` when the channel
    /// lengths differ.
    pub fn apply_stereo(
        &mut self,
        left: &[f32],
        right: &[f32],
    ) -> Result<(Vec<f32>, Vec<f32>), EffectError> {
        if left.len() != right.len() {
            return Err(EffectError::InvalidInput(format!(
                "stereo channels differ in length ({} vs {})",
                left.len(),
                right.len()
            )));
        }

        let DelaySettings {
            feedback,
            mix,
            ping_pong,
            ..
        } = self.settings;
        let straight = (1.0 - ping_pong) * feedback;
        let cross = ping_pong * feedback;

        let mut out_left = Vec::with_capacity(left.len());
        let mut out_right = Vec::with_capacity(right.len());
        for (&x_l, &x_r) in left.iter().zip(right.iter()) {
            let delayed_l = self.left.oldest();
            let delayed_r = self.right.oldest();
            let filtered_l = self.left.shape(delayed_l);
            let filtered_r = self.right.shape(delayed_r);

            out_left.push(x_l * (1.0 - mix) + delayed_l * mix);
            out_right.push(x_r * (1.0 - mix) + delayed_r * mix);

            self.left
                .write(x_l + filtered_l * straight + filtered_r * cross);
            self.right
                .write(x_r + filtered_r * straight + filtered_l * cross);
        }

        Ok((out_left, out_right))
    }

    fn rebuild_lines(&mut self) {
        self.left = DelayLine::new(&self.settings, self.sample_rate);
        self.right = DelayLine::new(&self.settings, self.sample_rate);
        debug!(
            "Delay: reallocated delay line ({} samples @ {} Hz)",
            self.left.len(),
            self.sample_rate
        );
    }
}

impl Effect for Delay {
    fn type_name(&self) -> &'static str {
        "Delay"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn set_sample_rate(&mut self, sample_rate: u32) {
        let sample_rate = sanitize_sample_rate(sample_rate);
        if sample_rate == self.sample_rate {
            return;
        }
        self.sample_rate = sample_rate;
        self.rebuild_lines();
    }

    fn parameter_range(&self, name: &str) -> Option<ParamRange> {
        range_of(name)
    }

    fn parameters(&self) -> ParameterMap {
        let s = &self.settings;
        [
            ("delay_time_ms", s.delay_time_ms),
            ("feedback", s.feedback),
            ("mix", s.mix),
            ("low_cut", s.low_cut),
            ("high_cut", s.high_cut),
            ("ping_pong", s.ping_pong),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        let mut next = self.settings;
        merge_clamped(self.type_name(), params, range_of, |name, value| match name {
            "delay_time_ms" => next.delay_time_ms = value,
            "feedback" => next.feedback = value,
            "mix" => next.mix = value,
            "low_cut" => next.low_cut = value,
            "high_cut" => next.high_cut = value,
            "ping_pong" => next.ping_pong = value,
            _ => {}
        });

        let retime = changed(self.settings.delay_time_ms, next.delay_time_ms);
        let refilter = changed(self.settings.low_cut, next.low_cut)
            || changed(self.settings.high_cut, next.high_cut);
        self.settings = next;

        if retime {
            self.rebuild_lines();
        } else if refilter {
            self.left.set_cutoffs(&self.settings, self.sample_rate);
            self.right.set_cutoffs(&self.settings, self.sample_rate);
        }
    }

    fn apply(&mut self, input: &[f32]) -> Result<Vec<f32>, EffectError> {
        let DelaySettings { feedback, mix, .. } = self.settings;
        let mut output = Vec::with_capacity(input.len());
        for &x in input {
            let delayed = self.left.oldest();
            let filtered = self.left.shape(delayed);
            output.push(x * (1.0 - mix) + delayed * mix);
            self.left.write(x + filtered * feedback);
        }
        Ok(output)
    }

    fn reset_state(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

/// One channel of delay: ring buffer plus feedback-path filters.
#[derive(Clone)]
struct DelayLine {
    buffer: Fixed<Vec<f32>>,
    low_cut: OnePoleHighPass,
    high_cut: OnePoleLowPass,
}

impl DelayLine {
    fn new(settings: &DelaySettings, sample_rate: u32) -> Self {
        let len = delay_samples(settings.delay_time_ms, sample_rate);
        Self {
            buffer: Fixed::from(vec![0.0; len]),
            low_cut: OnePoleHighPass::new(settings.low_cut, sample_rate),
            high_cut: OnePoleLowPass::new(settings.high_cut, sample_rate),
        }
    }

    fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Sample written exactly one delay-time ago.
    #[inline]
    fn oldest(&self) -> f32 {
        *self.buffer.get(0)
    }

    /// Feedback-path filtering.
    #[inline]
    fn shape(&mut self, sample: f32) -> f32 {
        self.high_cut.process(self.low_cut.process(sample))
    }

    /// Overwrite the oldest slot and advance the cursor.
    #[inline]
    fn write(&mut self, sample: f32) {
        self.buffer.push(sample);
    }

    fn set_cutoffs(&mut self, settings: &DelaySettings, sample_rate: u32) {
        self.low_cut.set_cutoff(settings.low_cut, sample_rate);
        self.high_cut.set_cutoff(settings.high_cut, sample_rate);
    }

    fn reset(&mut self) {
        let len = self.buffer.len();
        self.buffer = Fixed::from(vec![0.0; len]);
        self.low_cut.reset();
        self.high_cut.reset();
    }
}

fn delay_samples(delay_time_ms: f32, sample_rate: u32) -> usize {
    let samples = (delay_time_ms as f64 * sample_rate as f64 / 1_000.0).floor();
    (samples as usize).max(1)
}
