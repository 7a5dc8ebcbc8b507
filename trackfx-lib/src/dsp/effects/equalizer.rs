//! Multiband parametric EQ effect.
//!
//! An ordered bank of peaking bands. Each band is exposed as three flat
//! parameters, `band{i}_freq_hz`, `band{i}_gain_db` and `band{i}_q`, with `i`
//! counted from zero. The `bands` parameter sets how many bands exist.

use log::debug;
use serde::{Deserialize, Serialize};

use super::biquad::{Biquad, BiquadCoefficients};
use super::params::{changed, merge_clamped};
use super::{sanitize_sample_rate, Effect, ParamRange, ParameterMap, DEFAULT_SAMPLE_RATE};
use crate::error::EffectError;

const DEFAULT_LOW_FREQ_HZ: f32 = 120.0;
const DEFAULT_MID_FREQ_HZ: f32 = 1_000.0;
const DEFAULT_HIGH_FREQ_HZ: f32 = 8_000.0;
const DEFAULT_Q: f32 = 0.8;
const DEFAULT_GAIN_DB: f32 = 0.0;

pub const BANDS: ParamRange = ParamRange::new(1.0, 8.0, 3.0);
pub const FREQ_HZ: ParamRange = ParamRange::new(20.0, 20_000.0, DEFAULT_MID_FREQ_HZ);
pub const GAIN_DB: ParamRange = ParamRange::new(-24.0, 24.0, DEFAULT_GAIN_DB);
pub const Q: ParamRange = ParamRange::new(0.1, 10.0, DEFAULT_Q);

const MAX_BANDS: usize = 8;

/// Band field addressed by a flat parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BandField {
    Freq,
    Gain,
    Q,
}

/// Parse `band{i}_{field}`.
fn parse_band_key(name: &str) -> Option<(usize, BandField)> {
    let rest = name.strip_prefix("band")?;
    let (index, field) = rest.split_once('_')?;
    let index: usize = index.parse().ok()?;
    if index >= MAX_BANDS {
        return None;
    }
    let field = match field {
        "freq_hz" => BandField::Freq,
        "gain_db" => BandField::Gain,
        "q" => BandField::Q,
        _ => return None,
    };
    Some((index, field))
}

fn range_of(name: &str) -> Option<ParamRange> {
    if name == "bands" {
        return Some(BANDS);
    }
    parse_band_key(name).map(|(_, field)| match field {
        BandField::Freq => FREQ_HZ,
        BandField::Gain => GAIN_DB,
        BandField::Q => Q,
    })
}

/// Settings for a single peaking band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqBand {
    #[serde(alias = "frequency")]
    pub freq_hz: f32,
    #[serde(alias = "gain")]
    pub gain_db: f32,
    pub q: f32,
}

impl EqBand {
    /// Create a band, clamping every field into its range.
    pub fn new(freq_hz: f32, gain_db: f32, q: f32) -> Self {
        Self {
            freq_hz: FREQ_HZ.clamp(freq_hz).unwrap_or(FREQ_HZ.default),
            gain_db: GAIN_DB.clamp(gain_db).unwrap_or(GAIN_DB.default),
            q: Q.clamp(q).unwrap_or(Q.default),
        }
    }

    fn coefficients(&self, sample_rate: u32) -> BiquadCoefficients {
        BiquadCoefficients::peaking(sample_rate, self.freq_hz, self.q, self.gain_db)
    }
}

impl Default for EqBand {
    fn default() -> Self {
        Self {
            freq_hz: DEFAULT_MID_FREQ_HZ,
            gain_db: DEFAULT_GAIN_DB,
            q: DEFAULT_Q,
        }
    }
}

/// Configured equalizer with one biquad per band.
#[derive(Debug, Clone)]
pub struct Equalizer {
    sample_rate: u32,
    bands: Vec<EqBand>,
    filters: Vec<Biquad>,
}

impl Default for Equalizer {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl Equalizer {
    /// Three flat bands at 120 Hz, 1 kHz and 8 kHz.
    pub fn new(sample_rate: u32) -> Self {
        Self::with_bands(
            sample_rate,
            vec![
                EqBand::new(DEFAULT_LOW_FREQ_HZ, DEFAULT_GAIN_DB, DEFAULT_Q),
                EqBand::new(DEFAULT_MID_FREQ_HZ, DEFAULT_GAIN_DB, DEFAULT_Q),
                EqBand::new(DEFAULT_HIGH_FREQ_HZ, DEFAULT_GAIN_DB, DEFAULT_Q),
            ],
        )
    }

    /// Build an equalizer from explicit bands.
    ///
    /// The bank is truncated to eight bands; an empty list yields one flat
    /// default band.
    pub fn with_bands(sample_rate: u32, mut bands: Vec<EqBand>) -> Self {
        let sample_rate = sanitize_sample_rate(sample_rate);
        bands.truncate(MAX_BANDS);
        if bands.is_empty() {
            bands.push(EqBand::default());
        }
        let filters = bands
            .iter()
            .map(|band| Biquad::new(band.coefficients(sample_rate)))
            .collect();
        Self {
            sample_rate,
            bands,
            filters,
        }
    }

    pub fn bands(&self) -> &[EqBand] {
        &self.bands
    }

    fn resize_bands(&mut self, count: usize) {
        let count = count.clamp(1, MAX_BANDS);
        if count == self.bands.len() {
            return;
        }
        debug!("Equalizer: {} -> {} bands", self.bands.len(), count);
        self.bands.resize(count, EqBand::default());
        let sample_rate = self.sample_rate;
        self.filters.truncate(count);
        while self.filters.len() < count {
            let band = self.bands[self.filters.len()];
            self.filters.push(Biquad::new(band.coefficients(sample_rate)));
        }
    }

    fn redesign(&mut self, index: usize) {
        if let (Some(band), Some(filter)) = (self.bands.get(index), self.filters.get_mut(index)) {
            filter.set_coefficients(band.coefficients(self.sample_rate));
        }
    }
}

impl Effect for Equalizer {
    fn type_name(&self) -> &'static str {
        "Equalizer"
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
        for index in 0..self.bands.len() {
            self.redesign(index);
        }
        self.reset_state();
    }

    fn parameter_range(&self, name: &str) -> Option<ParamRange> {
        range_of(name)
    }

    fn parameters(&self) -> ParameterMap {
        let mut params = ParameterMap::new();
        params.insert("bands".to_string(), self.bands.len() as f32);
        for (index, band) in self.bands.iter().enumerate() {
            params.insert(format!("band{}_freq_hz", index), band.freq_hz);
            params.insert(format!("band{}_gain_db", index), band.gain_db);
            params.insert(format!("band{}_q", index), band.q);
        }
        params
    }

    fn set_parameters(&mut self, params: &ParameterMap) {
        // Band count first so band keys in the same map can address new bands.
        if let Some(&count) = params.get("bands") {
            match BANDS.clamp(count) {
                Some(count) => self.resize_bands(count.round() as usize),
                None => log::warn!("Equalizer: ignoring non-finite value for \"bands\""),
            }
        }

        let mut touched = [false; MAX_BANDS];
        let bands = &mut self.bands;
        merge_clamped("Equalizer", params, range_of, |name, value| {
            let Some((index, field)) = parse_band_key(name) else {
                return;
            };
            let Some(band) = bands.get_mut(index) else {
                debug!("Equalizer: ignoring \"{}\" beyond band count", name);
                return;
            };
            let slot = match field {
                BandField::Freq => &mut band.freq_hz,
                BandField::Gain => &mut band.gain_db,
                BandField::Q => &mut band.q,
            };
            if changed(*slot, value) {
                *slot = value;
                touched[index] = true;
            }
        });

        for index in 0..self.bands.len() {
            if touched[index] {
                self.redesign(index);
            }
        }
    }

    fn apply(&mut self, input: &[f32]) -> Result<Vec<f32>, EffectError> {
        let mut output = input.to_vec();
        for filter in &mut self.filters {
            filter.process_block(&mut output);
        }
        Ok(output)
    }

    fn reset_state(&mut self) {
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}
