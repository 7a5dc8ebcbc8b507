//! Compressor effect for dynamic range control.

use serde::{Deserialize, Serialize};

use super::level::{db_to_linear, linear_to_db};
use super::params::merge_clamped;
use super::{sanitize_sample_rate, Effect, ParamRange, ParameterMap, DEFAULT_SAMPLE_RATE};
use crate::error::EffectError;

pub const THRESHOLD_DB: ParamRange = ParamRange::new(-60.0, 0.0, -20.0);
pub const RATIO: ParamRange = ParamRange::new(1.0, 20.0, 4.0);
pub const MAKEUP_GAIN_DB: ParamRange = ParamRange::new(-24.0, 24.0, 0.0);
pub const ATTACK_MS: ParamRange = ParamRange::new(0.1, 500.0, 10.0);
pub const RELEASE_MS: ParamRange = ParamRange::new(1.0, 5_000.0, 100.0);

fn range_of(name: &str) -> Option<ParamRange> {
    match name {
        "threshold" => Some(THRESHOLD_DB),
        "ratio" => Some(RATIO),
        "makeup_gain" => Some(MAKEUP_GAIN_DB),
        "attack_ms" => Some(ATTACK_MS),
        "release_ms" => Some(RELEASE_MS),
        _ => None,
    }
}

/// Compressor parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorSettings {
    #[serde(alias = "threshold_db")]
    pub threshold: f32,
    pub ratio: f32,
    #[serde(alias = "makeup_db", alias = "makeup_gain_db")]
    pub makeup_gain: f32,
    #[serde(alias = "attack")]
    pub attack_ms: f32,
    #[serde(alias = "release")]
    pub release_ms: f32,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold: THRESHOLD_DB.default,
            ratio: RATIO.default,
            makeup_gain: MAKEUP_GAIN_DB.default,
            attack_ms: ATTACK_MS.default,
            release_ms: RELEASE_MS.default,
        }
    }
}

/// Feed-forward compressor driven by a peak envelope follower.
#[derive(Debug, Clone)]
pub struct Compressor {
    sample_rate: u32,
    settings: CompressorSettings,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl Compressor {
    pub fn new(sample_rate: u32) -> Self {
        let mut compressor = Self {
            sample_rate: sanitize_sample_rate(sample_rate),
            settings: CompressorSettings::default(),
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
        };
        compressor.update_coefficients();
        compressor
    }

    pub fn with_parameters(sample_rate: u32, params: &ParameterMap) -> Self {
        let mut compressor = Self::new(sample_rate);
        compressor.set_parameters(params);
        compressor
    }

    pub fn settings(&self) -> CompressorSettings {
        self.settings
    }

    /// Current envelope level (linear, never negative).
    pub fn envelope(&self) -> f32 {
        self.envelope
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_to_coeff(self.settings.attack_ms, self.sample_rate);
        self.release_coeff = time_to_coeff(self.settings.release_ms, self.sample_rate);
    }

    #[inline]
    fn follow(&mut self, level: f32) -> f32 {
        let coeff = if level > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = (coeff * self.envelope + (1.0 - coeff) * level).max(0.0);
        self.envelope
    }
}

impl Effect for Compressor {
    fn type_name(&self) -> &'static str {
        "Compressor"
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
        self.update_coefficients();
    }

    fn parameter_range(&self, name: &str) -> Option<ParamRange> {
        range_of(name)
    }

    fn parameters(&self) -> ParameterMap {
        let s = &self.settings;
        [
            ("threshold", s.threshold),
            ("ratio", s.ratio),
            ("makeup_gain", s.makeup_gain),
            ("attack_ms", s.attack_ms),
            ("release_ms", s.release_ms),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        let settings = &mut self.settings;
        merge_clamped("Compressor", params, range_of, |name, value| match name {
            "threshold" => settings.threshold = value,
            "ratio" => settings.ratio = value,
            "makeup_gain" => settings.makeup_gain = value,
            "attack_ms" => settings.attack_ms = value,
            "release_ms" => settings.release_ms = value,
            _ => {}
        });
        self.update_coefficients();
    }

    fn apply(&mut self, input: &[f32]) -> Result<Vec<f32>, EffectError> {
        let CompressorSettings {
            threshold,
            ratio,
            makeup_gain,
            ..
        } = self.settings;
        let makeup = db_to_linear(makeup_gain);

        let mut output = Vec::with_capacity(input.len());
        for &x in input {
            let envelope = self.follow(x.abs());
            let gain_db = compute_gain_db(linear_to_db(envelope), threshold, ratio);
            output.push(x * db_to_linear(gain_db) * makeup);
        }
        Ok(output)
    }

    fn reset_state(&mut self) {
        self.envelope = 0.0;
    }
}

fn compute_gain_db(level_db: f32, threshold_db: f32, ratio: f32) -> f32 {
    if level_db <= threshold_db {
        0.0
    } else {
        (threshold_db - level_db) * (1.0 - 1.0 / ratio)
    }
}

fn time_to_coeff(time_ms: f32, sample_rate: u32) -> f32 {
    let t = time_ms / 1000.0;
    (-1.0 / (t * sample_rate as f32)).exp()
}
