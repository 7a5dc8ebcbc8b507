//! Helpers for converting between linear and dB gain values.

/// Floor used when converting silence to dB.
pub(crate) const MIN_LEVEL_DB: f32 = -120.0;

/// Convert a dB value to linear gain.
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert a linear gain to dB.
///
/// Zero and negative input map to [`MIN_LEVEL_DB`] instead of `-inf`.
pub fn linear_to_db(value: f32) -> f32 {
    if value <= 0.0 {
        return MIN_LEVEL_DB;
    }
    (20.0 * value.log10()).max(MIN_LEVEL_DB)
}
