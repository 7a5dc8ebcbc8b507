//! Named effect parameters and their declared ranges.

use std::collections::BTreeMap;

use log::{debug, warn};

/// Mapping from parameter name to value.
///
/// A `BTreeMap` keeps snapshots and serialized configs in a stable order.
pub type ParameterMap = BTreeMap<String, f32>;

/// Valid range and default value of one effect parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl ParamRange {
    /// Declare a parameter range.
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    /// Clamp `value` into the range.
    ///
    /// # Returns
    /// `None` for NaN or infinite input, which callers must not store.
    pub fn clamp(&self, value: f32) -> Option<f32> {
        if !value.is_finite() {
            return None;
        }
        Some(value.clamp(self.min, self.max))
    }

    /// Whether `value` lies inside the range.
    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Merge `params` into an effect, one clamped value at a time.
///
/// Unknown names are skipped (forward compatible). Non-finite values are
/// skipped so the current value survives.
///
/// # Arguments
/// - `effect`: Effect type name, used for log context.
/// - `params`: Partial parameter mapping to merge.
/// - `range_of`: Range lookup for a parameter name.
/// - `store`: Receives each accepted `(name, clamped_value)` pair.
pub(crate) fn merge_clamped(
    effect: &str,
    params: &ParameterMap,
    range_of: impl Fn(&str) -> Option<ParamRange>,
    mut store: impl FnMut(&str, f32),
) {
    for (name, &value) in params {
        let Some(range) = range_of(name) else {
            debug!("{}: ignoring unknown parameter \"{}\"", effect, name);
            continue;
        };
        let Some(clamped) = range.clamp(value) else {
            warn!("{}: ignoring non-finite value for \"{}\"", effect, name);
            continue;
        };
        store(name, clamped);
    }
}

/// Compare two parameter values for change detection.
pub(crate) fn changed(current: f32, next: f32) -> bool {
    (current - next).abs() > f32::EPSILON
}
