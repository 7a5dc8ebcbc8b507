//! Persisted effect-chain configuration and the effect-type registry.
//!
//! A chain is stored as an ordered list of [`EffectConfig`] records. Loading
//! goes through an explicit [`EffectRegistry`] that maps each stored type
//! name to a factory, so new effect types can be added without touching the
//! loader.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::chain::{EffectChain, EffectSlot};
use crate::dsp::effects::{Compressor, Delay, Effect, Equalizer, ParameterMap, Reverb};
use crate::error::ConfigError;

fn default_wet() -> f32 {
    1.0
}

/// Serialized form of one effect slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectConfig {
    /// Registry key of the effect type.
    #[serde(rename = "type")]
    pub effect_type: String,
    /// Display name; empty means "use the type name".
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bypass: bool,
    #[serde(default = "default_wet")]
    pub wet: f32,
    #[serde(default, alias = "params")]
    pub parameters: ParameterMap,
}

impl EffectConfig {
    /// Config for a fully wet, active slot with default parameters.
    pub fn new(effect_type: impl Into<String>) -> Self {
        let effect_type = effect_type.into();
        Self {
            name: effect_type.clone(),
            effect_type,
            bypass: false,
            wet: default_wet(),
            parameters: ParameterMap::new(),
        }
    }

    /// Snapshot a live slot.
    pub fn from_slot(slot: &EffectSlot) -> Self {
        Self {
            effect_type: slot.effect().type_name().to_string(),
            name: slot.name().to_string(),
            bypass: slot.bypass(),
            wet: slot.wet(),
            parameters: slot.effect().parameters(),
        }
    }
}

/// Constructor for one effect type, bound to a sample rate.
pub type EffectFactory = Arc<dyn Fn(u32) -> Box<dyn Effect> + Send + Sync>;

/// Mapping from effect type name to factory.
#[derive(Clone)]
pub struct EffectRegistry {
    factories: BTreeMap<String, EffectFactory>,
}

impl std::fmt::Debug for EffectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectRegistry")
            .field("types", &self.type_names())
            .finish()
    }
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::with_builtin_effects()
    }
}

impl EffectRegistry {
    /// A registry with no types.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry holding `Delay`, `Compressor`, `Equalizer` and `Reverb`.
    pub fn with_builtin_effects() -> Self {
        let mut registry = Self::empty();
        registry.register("Delay", |sample_rate| Box::new(Delay::new(sample_rate)));
        registry.register("Compressor", |sample_rate| {
            Box::new(Compressor::new(sample_rate))
        });
        registry.register("Equalizer", |sample_rate| {
            Box::new(Equalizer::new(sample_rate))
        });
        registry.register("Reverb", |sample_rate| Box::new(Reverb::new(sample_rate)));
        registry
    }

    /// Add or replace the factory for `type_name`.
    pub fn register<F>(&mut self, type_name: impl Into<String>, factory: F)
    where
        F: Fn(u32) -> Box<dyn Effect> + Send + Sync + 'static,
    {
        let type_name = type_name.into();
        debug!("registry: register \"{}\"", type_name);
        self.factories.insert(type_name, Arc::new(factory));
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Registered type names in sorted order.
    pub fn type_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct a default instance of `type_name`.
    pub fn create(&self, type_name: &str, sample_rate: u32) -> Option<Box<dyn Effect>> {
        self.factories
            .get(type_name)
            .map(|factory| factory(sample_rate))
    }
}

impl EffectChain {
    /// Snapshot every slot in order.
    pub fn to_config(&self) -> Vec<EffectConfig> {
        self.slots().iter().map(EffectConfig::from_slot).collect()
    }

    /// Rebuild a chain from stored configuration.
    ///
    /// Every effect is constructed at `sample_rate` and then receives its
    /// stored parameters (clamped as usual). An unknown type aborts the whole
    /// load; no partial chain is returned.
    pub fn from_config(
        configs: &[EffectConfig],
        registry: &EffectRegistry,
        sample_rate: u32,
    ) -> Result<Self, ConfigError> {
        let mut chain = EffectChain::new();
        for (index, config) in configs.iter().enumerate() {
            let mut effect = registry
                .create(&config.effect_type, sample_rate)
                .ok_or_else(|| ConfigError::UnknownEffectType {
                    index,
                    type_name: config.effect_type.clone(),
                })?;
            effect.set_parameters(&config.parameters);

            let name = if config.name.is_empty() {
                config.effect_type.clone()
            } else {
                config.name.clone()
            };
            let mut slot = EffectSlot::new(effect, name, config.wet);
            slot.set_bypass(config.bypass);
            chain.push_slot(slot);
        }
        info!(
            "loaded effect chain with {} slot(s) @ {} Hz",
            chain.len(),
            sample_rate
        );
        Ok(chain)
    }
}

/// Serialize a chain to a JSON array.
pub fn chain_to_json(chain: &EffectChain) -> Result<String, ConfigError> {
    Ok(serde_json::to_string_pretty(&chain.to_config())?)
}

/// Parse a JSON array and rebuild the chain it describes.
pub fn chain_from_json(
    json: &str,
    registry: &EffectRegistry,
    sample_rate: u32,
) -> Result<EffectChain, ConfigError> {
    let configs: Vec<EffectConfig> = serde_json::from_str(json)?;
    EffectChain::from_config(&configs, registry, sample_rate)
}
