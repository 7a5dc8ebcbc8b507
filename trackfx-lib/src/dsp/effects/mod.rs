//! Chainable DSP effect modules.

use std::fmt::Debug;

use crate::error::EffectError;

mod biquad;
pub mod compressor;
pub mod delay;
pub mod equalizer;
mod filters;
mod level;
mod params;
pub mod reverb;

pub use compressor::Compressor;
pub use delay::Delay;
pub use equalizer::{EqBand, Equalizer};
pub use level::{db_to_linear, linear_to_db};
pub use params::{ParamRange, ParameterMap};
pub use reverb::Reverb;

/// Sample rate used by `Default` implementations of the built-in effects.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// A stateful transform from one block of mono samples to another.
///
/// Implementations own their internal state (delay lines, filter memory,
/// envelopes). Successive [`Effect::apply`] calls represent consecutive,
/// non-overlapping blocks of time, so one instance must only ever be driven
/// by one chain.
pub trait Effect: Send + Debug {
    /// Registry key for this effect type, e.g. `"Delay"`.
    fn type_name(&self) -> &'static str;

    /// Sample rate the effect state is currently bound to.
    fn sample_rate(&self) -> u32;

    /// Rebind the effect to a new sample rate.
    ///
    /// Rate-dependent state is rebuilt when the rate changes; calling with the
    /// current rate is a no-op.
    fn set_sample_rate(&mut self, sample_rate: u32);

    /// Declared range of a parameter, or `None` if the name is unknown.
    fn parameter_range(&self, name: &str) -> Option<ParamRange>;

    /// Snapshot of the full current parameter set.
    fn parameters(&self) -> ParameterMap;

    /// Merge a partial parameter mapping into the current set.
    ///
    /// Values are clamped to their declared ranges; unknown names and
    /// non-finite values are ignored.
    fn set_parameters(&mut self, params: &ParameterMap);

    /// Process one block.
    ///
    /// The input is never modified. The returned buffer has the same length
    /// as `input`; internal state advances by `input.len()` samples.
    fn apply(&mut self, input: &[f32]) -> Result<Vec<f32>, EffectError>;

    /// Clear any history (delay lines, envelopes) while keeping parameters.
    fn reset_state(&mut self);
}

pub(crate) fn sanitize_sample_rate(sample_rate: u32) -> u32 {
    sample_rate.max(1)
}
