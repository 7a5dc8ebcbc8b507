//! Algorithmic reverb with smooth diffusion.
//!
//! Classic Schroeder layout:
//! 1) A pre-delay to separate the direct sound from the reverb onset.
//! 2) Four parallel lowpass feedback comb filters to build decay.
//! 3) Two series allpass filters to smooth the diffusion.
//!
//! The network is fully deterministic: the same parameters and input always
//! produce the same output.

use dasp_ring_buffer::Fixed;
use log::debug;
use serde::{Deserialize, Serialize};

use super::params::{changed, merge_clamped};
use super::{sanitize_sample_rate, Effect, ParamRange, ParameterMap, DEFAULT_SAMPLE_RATE};
use crate::error::EffectError;

pub const PRE_DELAY_MS: ParamRange = ParamRange::new(0.0, 100.0, 12.0);
pub const ROOM_SIZE_MS: ParamRange = ParamRange::new(10.0, 100.0, 48.0);
pub const DECAY: ParamRange = ParamRange::new(0.0, 0.98, 0.7);
pub const DAMPING: ParamRange = ParamRange::new(0.0, 0.99, 0.35);
pub const MIX: ParamRange = ParamRange::new(0.0, 1.0, 0.35);

const DIFFUSION: f32 = 0.5;
const COMB_TUNING_MULTIPLIERS: [f32; 4] = [1.0, 1.33, 1.58, 1.91];
const ALLPASS_TUNING_MULTIPLIERS: [f32; 2] = [0.28, 0.52];

fn range_of(name: &str) -> Option<ParamRange> {
    match name {
        "pre_delay_ms" => Some(PRE_DELAY_MS),
        "room_size_ms" => Some(ROOM_SIZE_MS),
        "decay" => Some(DECAY),
        "damping" => Some(DAMPING),
        "mix" => Some(MIX),
        _ => None,
    }
}

/// Reverb parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbSettings {
    /// Pre-delay time in milliseconds.
    pub pre_delay_ms: f32,
    /// Base delay time in milliseconds that scales the comb filters.
    pub room_size_ms: f32,
    /// Comb feedback. Higher values mean a longer tail.
    pub decay: f32,
    /// Lowpass damping inside the comb feedback path.
    pub damping: f32,
    #[serde(alias = "dry_wet", alias = "wet_dry")]
    pub mix: f32,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            pre_delay_ms: PRE_DELAY_MS.default,
            room_size_ms: ROOM_SIZE_MS.default,
            decay: DECAY.default,
            damping: DAMPING.default,
            mix: MIX.default,
        }
    }
}

/// Diffusion reverb effect (pre-delay + combs + allpass diffusion).
#[derive(Clone)]
pub struct Reverb {
    sample_rate: u32,
    settings: ReverbSettings,
    network: Network,
}

impl std::fmt::Debug for Reverb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reverb")
            .field("sample_rate", &self.sample_rate)
            .field("settings", &self.settings)
            .field("tuning", &self.network.tuning)
            .finish()
    }
}

impl Default for Reverb {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl Reverb {
    pub fn new(sample_rate: u32) -> Self {
        let sample_rate = sanitize_sample_rate(sample_rate);
        let settings = ReverbSettings::default();
        Self {
            sample_rate,
            settings,
            network: Network::new(Tuning::new(&settings, sample_rate)),
        }
    }

    pub fn with_parameters(sample_rate: u32, params: &ParameterMap) -> Self {
        let mut reverb = Self::new(sample_rate);
        reverb.set_parameters(params);
        reverb
    }

    pub fn settings(&self) -> ReverbSettings {
        self.settings
    }

    fn retune(&mut self) {
        let tuning = Tuning::new(&self.settings, self.sample_rate);
        debug!("Reverb: retuned network {:?}", tuning);
        self.network = Network::new(tuning);
    }
}

impl Effect for Reverb {
    fn type_name(&self) -> &'static str {
        "Reverb"
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
        self.retune();
    }

    fn parameter_range(&self, name: &str) -> Option<ParamRange> {
        range_of(name)
    }

    fn parameters(&self) -> ParameterMap {
        let s = &self.settings;
        [
            ("pre_delay_ms", s.pre_delay_ms),
            ("room_size_ms", s.room_size_ms),
            ("decay", s.decay),
            ("damping", s.damping),
            ("mix", s.mix),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        let mut next = self.settings;
        merge_clamped("Reverb", params, range_of, |name, value| match name {
            "pre_delay_ms" => next.pre_delay_ms = value,
            "room_size_ms" => next.room_size_ms = value,
            "decay" => next.decay = value,
            "damping" => next.damping = value,
            "mix" => next.mix = value,
            _ => {}
        });
        let retune = changed(self.settings.pre_delay_ms, next.pre_delay_ms)
            || changed(self.settings.room_size_ms, next.room_size_ms);
        self.settings = next;
        if retune {
            self.retune();
        }
    }

    fn apply(&mut self, input: &[f32]) -> Result<Vec<f32>, EffectError> {
        let ReverbSettings {
            decay,
            damping,
            mix,
            ..
        } = self.settings;
        let mut output = Vec::with_capacity(input.len());
        for &sample in input {
            let wet = self.network.process(sample, decay, damping);
            output.push(sample * (1.0 - mix) + wet * mix);
        }
        Ok(output)
    }

    fn reset_state(&mut self) {
        self.network.reset();
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Tuning {
    pre_delay_samples: usize,
    comb_samples: [usize; 4],
    allpass_samples: [usize; 2],
}

impl Tuning {
    fn new(settings: &ReverbSettings, sample_rate: u32) -> Self {
        let pre_delay_samples = ms_to_samples(settings.pre_delay_ms, sample_rate);
        let room_size_samples = ms_to_samples(settings.room_size_ms, sample_rate) as f32;
        Self {
            pre_delay_samples,
            comb_samples: COMB_TUNING_MULTIPLIERS
                .map(|multiplier| ((room_size_samples * multiplier).round() as usize).max(1)),
            allpass_samples: ALLPASS_TUNING_MULTIPLIERS
                .map(|multiplier| ((room_size_samples * multiplier).round() as usize).max(1)),
        }
    }
}

#[derive(Clone)]
struct Network {
    tuning: Tuning,
    pre_delay: Option<Fixed<Vec<f32>>>,
    combs: [CombFilter; 4],
    allpass: [AllpassFilter; 2],
}

impl Network {
    fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            pre_delay: (tuning.pre_delay_samples > 0)
                .then(|| Fixed::from(vec![0.0; tuning.pre_delay_samples])),
            combs: tuning.comb_samples.map(CombFilter::new),
            allpass: tuning.allpass_samples.map(AllpassFilter::new),
        }
    }

    fn reset(&mut self) {
        *self = Self::new(self.tuning);
    }

    #[inline]
    fn process(&mut self, sample: f32, decay: f32, damping: f32) -> f32 {
        let delayed = match self.pre_delay.as_mut() {
            Some(line) => line.push(sample),
            None => sample,
        };
        let mut comb_sum = 0.0;
        for comb in &mut self.combs {
            comb_sum += comb.process(delayed, decay, damping);
        }
        let mut wet = comb_sum * 0.25;
        for allpass in &mut self.allpass {
            wet = allpass.process(wet, DIFFUSION);
        }
        wet
    }
}

#[derive(Clone)]
struct CombFilter {
    buffer: Fixed<Vec<f32>>,
    lowpass: f32,
}

impl CombFilter {
    fn new(len: usize) -> Self {
        Self {
            buffer: Fixed::from(vec![0.0; len.max(1)]),
            lowpass: 0.0,
        }
    }

    fn process(&mut self, input: f32, feedback: f32, damping: f32) -> f32 {
        let delayed = *self.buffer.get(0);
        self.lowpass = delayed * (1.0 - damping) + self.lowpass * damping;
        self.buffer.push(input + self.lowpass * feedback);
        self.lowpass
    }
}

#[derive(Clone)]
struct AllpassFilter {
    buffer: Fixed<Vec<f32>>,
}

impl AllpassFilter {
    fn new(len: usize) -> Self {
        Self {
            buffer: Fixed::from(vec![0.0; len.max(1)]),
        }
    }

    fn process(&mut self, input: f32, feedback: f32) -> f32 {
        let delayed = *self.buffer.get(0);
        self.buffer.push(input + delayed * feedback);
        delayed - feedback * input
    }
}

fn ms_to_samples(duration_ms: f32, sample_rate: u32) -> usize {
    (duration_ms as f64 * sample_rate as f64 / 1_000.0).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, f32)]) -> ParameterMap {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut buffer = vec![0.0; len];
        buffer[0] = 1.0;
        buffer
    }

    #[test]
    fn zero_mix_is_dry() {
        let mut reverb = Reverb::with_parameters(48_000, &params(&[("mix", 0.0)]));
        let input: Vec<f32> = (0..1_024).map(|i| ((i as f32) * 0.2).sin()).collect();
        let output = reverb.apply(&input).expect("apply");
        assert_eq!(output, input);
    }

    #[test]
    fn impulse_produces_a_tail() {
        let mut reverb = Reverb::with_parameters(
            1_000,
            &params(&[("mix", 1.0), ("pre_delay_ms", 0.0), ("room_size_ms", 10.0)]),
        );
        let output = reverb.apply(&impulse(2_000)).expect("apply");
        let late_energy: f32 = output[100..].iter().map(|s| s * s).sum();
        assert!(late_energy > 0.0);
        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn output_is_deterministic() {
        let input: Vec<f32> = (0..4_096).map(|i| ((i as f32) * 0.013).sin()).collect();
        let mut a = Reverb::new(44_100);
        let mut b = Reverb::new(44_100);
        assert_eq!(a.apply(&input).expect("a"), b.apply(&input).expect("b"));
    }

    #[test]
    fn pre_delay_holds_back_the_wet_signal() {
        let mut reverb = Reverb::with_parameters(
            1_000,
            &params(&[("mix", 1.0), ("pre_delay_ms", 50.0), ("room_size_ms", 10.0)]),
        );
        let output = reverb.apply(&impulse(200)).expect("apply");
        assert!(output[..50].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn reset_clears_the_tail() {
        let mut reverb = Reverb::with_parameters(1_000, &params(&[("mix", 1.0)]));
        let _ = reverb.apply(&impulse(64)).expect("apply");
        reverb.reset_state();
        let output = reverb.apply(&[0.0; 512]).expect("apply");
        assert!(output.iter().all(|&s| s == 0.0));
    }
}
