//! Effect slots and the ordered per-track effect chain.

use log::{debug, warn};

use crate::dsp::effects::{Effect, ParameterMap};
use crate::error::ChainError;

/// One position in an [`EffectChain`]: an effect plus its routing controls.
#[derive(Debug)]
pub struct EffectSlot {
    effect: Box<dyn Effect>,
    name: String,
    bypass: bool,
    wet: f32,
}

impl EffectSlot {
    /// Wrap an effect. `wet` is clamped to `[0, 1]`; a non-finite value
    /// falls back to fully wet.
    pub fn new(effect: Box<dyn Effect>, name: impl Into<String>, wet: f32) -> Self {
        let wet = if wet.is_finite() {
            wet.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            effect,
            name: name.into(),
            bypass: false,
            wet,
        }
    }

    pub fn effect(&self) -> &dyn Effect {
        self.effect.as_ref()
    }

    pub fn effect_mut(&mut self) -> &mut dyn Effect {
        self.effect.as_mut()
    }

    pub fn into_effect(self) -> Box<dyn Effect> {
        self.effect
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn bypass(&self) -> bool {
        self.bypass
    }

    pub fn set_bypass(&mut self, bypass: bool) {
        self.bypass = bypass;
    }

    pub fn wet(&self) -> f32 {
        self.wet
    }

    /// Set the wet/dry blend, clamped to `[0, 1]`. Non-finite input is ignored.
    pub fn set_wet(&mut self, wet: f32) {
        if !wet.is_finite() {
            warn!("{}: ignoring non-finite wet value", self.name);
            return;
        }
        self.wet = wet.clamp(0.0, 1.0);
    }

    /// Run this slot over `stage`.
    ///
    /// # Returns
    /// `None` when bypassed (the effect is not invoked), otherwise the blended
    /// signal.
    fn process(&mut self, index: usize, stage: &[f32]) -> Result<Option<Vec<f32>>, ChainError> {
        if self.bypass {
            return Ok(None);
        }

        let wet_signal = self
            .effect
            .apply(stage)
            .map_err(|source| ChainError::Effect {
                index,
                name: self.name.clone(),
                source,
            })?;

        if wet_signal.len() != stage.len() {
            return Err(ChainError::LengthMismatch {
                index,
                name: self.name.clone(),
                expected: stage.len(),
                actual: wet_signal.len(),
            });
        }

        if self.wet >= 1.0 {
            return Ok(Some(wet_signal));
        }
        if self.wet <= 0.0 {
            return Ok(Some(stage.to_vec()));
        }

        let wet = self.wet;
        let dry = 1.0 - wet;
        Ok(Some(
            stage
                .iter()
                .zip(wet_signal.iter())
                .map(|(&d, &w)| d * dry + w * wet)
                .collect(),
        ))
    }
}

/// Ordered list of effect slots; slot order is signal-flow order.
#[derive(Debug, Default)]
pub struct EffectChain {
    slots: Vec<EffectSlot>,
}

impl EffectChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[EffectSlot] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&EffectSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut EffectSlot> {
        self.slots.get_mut(index)
    }

    /// Append an effect to the end of the chain.
    ///
    /// # Arguments
    /// - `effect`: Effect instance; the chain takes ownership of it and its state.
    /// - `name`: Display name, defaulting to the effect's type name.
    /// - `wet`: Wet/dry blend, clamped to `[0, 1]`.
    ///
    /// # Returns
    /// The slot's position at the time of the call. Positions shift on
    /// removal and moves, so the index is only valid until the next mutation.
    pub fn add_effect(&mut self, effect: Box<dyn Effect>, name: Option<&str>, wet: f32) -> usize {
        let name = name.unwrap_or_else(|| effect.type_name()).to_string();
        debug!("chain: add \"{}\" at {}", name, self.slots.len());
        self.slots.push(EffectSlot::new(effect, name, wet));
        self.slots.len() - 1
    }

    /// Append a pre-built slot.
    pub fn push_slot(&mut self, slot: EffectSlot) -> usize {
        self.slots.push(slot);
        self.slots.len() - 1
    }

    /// Remove and return the slot at `index`, shifting later slots down.
    pub fn remove_effect(&mut self, index: usize) -> Result<EffectSlot, ChainError> {
        self.check_index(index)?;
        Ok(self.slots.remove(index))
    }

    /// Move the slot at `from` so it ends up at position `to`.
    ///
    /// Both indices refer to the chain before the move. Every other slot keeps
    /// its relative order.
    pub fn move_effect(&mut self, from: usize, to: usize) -> Result<(), ChainError> {
        self.check_index(from)?;
        self.check_index(to)?;
        if from != to {
            let slot = self.slots.remove(from);
            self.slots.insert(to, slot);
        }
        Ok(())
    }

    pub fn clear_effects(&mut self) {
        self.slots.clear();
    }

    pub fn set_bypass(&mut self, index: usize, bypass: bool) -> Result<(), ChainError> {
        self.slot_at(index)?.set_bypass(bypass);
        Ok(())
    }

    pub fn set_wet(&mut self, index: usize, wet: f32) -> Result<(), ChainError> {
        self.slot_at(index)?.set_wet(wet);
        Ok(())
    }

    /// Merge `params` into the effect at `index`.
    pub fn set_parameters(&mut self, index: usize, params: &ParameterMap) -> Result<(), ChainError> {
        self.slot_at(index)?.effect_mut().set_parameters(params);
        Ok(())
    }

    /// Rebind every effect to `sample_rate`. Effects already at that rate are
    /// untouched, so state carries over between consecutive renders.
    pub fn prepare(&mut self, sample_rate: u32) {
        for slot in &mut self.slots {
            slot.effect_mut().set_sample_rate(sample_rate);
        }
    }

    /// Clear every effect's history, keeping parameters.
    pub fn reset_state(&mut self) {
        for slot in &mut self.slots {
            slot.effect_mut().reset_state();
        }
    }

    /// Process a block through every slot in order.
    ///
    /// Bypassed slots are skipped without invoking their effect. Any other
    /// slot blends its effect output with the running signal by `wet`.
    pub fn apply_chain(&mut self, input: &[f32]) -> Result<Vec<f32>, ChainError> {
        let mut stage = input.to_vec();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if let Some(next) = slot.process(index, &stage)? {
                stage = next;
            }
        }
        Ok(stage)
    }

    fn check_index(&self, index: usize) -> Result<(), ChainError> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(ChainError::IndexOutOfRange {
                index,
                len: self.slots.len(),
            })
        }
    }

    fn slot_at(&mut self, index: usize) -> Result<&mut EffectSlot, ChainError> {
        let len = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or(ChainError::IndexOutOfRange { index, len })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::dsp::effects::{Compressor, Delay, Equalizer, ParamRange};
    use crate::error::EffectError;

    /// Multiplies by a constant and counts invocations.
    #[derive(Debug)]
    struct Scale {
        factor: f32,
        calls: Arc<AtomicUsize>,
    }

    impl Scale {
        fn boxed(factor: f32, calls: &Arc<AtomicUsize>) -> Box<dyn Effect> {
            Box::new(Self {
                factor,
                calls: Arc::clone(calls),
            })
        }
    }

    impl Effect for Scale {
        fn type_name(&self) -> &'static str {
            "Scale"
        }
        fn sample_rate(&self) -> u32 {
            48_000
        }
        fn set_sample_rate(&mut self, _sample_rate: u32) {}
        fn parameter_range(&self, _name: &str) -> Option<ParamRange> {
            None
        }
        fn parameters(&self) -> ParameterMap {
            ParameterMap::new()
        }
        fn set_parameters(&mut self, _params: &ParameterMap) {}
        fn apply(&mut self, input: &[f32]) -> Result<Vec<f32>, EffectError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(input.iter().map(|s| s * self.factor).collect())
        }
        fn reset_state(&mut self) {}
    }

    /// Returns one sample too few.
    #[derive(Debug)]
    struct Truncate;

    impl Effect for Truncate {
        fn type_name(&self) -> &'static str {
            "Truncate"
        }
        fn sample_rate(&self) -> u32 {
            48_000
        }
        fn set_sample_rate(&mut self, _sample_rate: u32) {}
        fn parameter_range(&self, _name: &str) -> Option<ParamRange> {
            None
        }
        fn parameters(&self) -> ParameterMap {
            ParameterMap::new()
        }
        fn set_parameters(&mut self, _params: &ParameterMap) {}
        fn apply(&mut self, input: &[f32]) -> Result<Vec<f32>, EffectError> {
            Ok(input[..input.len().saturating_sub(1)].to_vec())
        }
        fn reset_state(&mut self) {}
    }

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    fn names(chain: &EffectChain) -> Vec<String> {
        chain.slots().iter().map(|s| s.name().to_string()).collect()
    }

    fn abc_chain() -> EffectChain {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = EffectChain::new();
        for name in ["A", "B", "C"] {
            chain.add_effect(Scale::boxed(1.0, &calls), Some(name), 1.0);
        }
        chain
    }

    #[test]
    fn empty_chain_is_identity() {
        let mut chain = EffectChain::new();
        let input = vec![0.1, -0.2, 0.3];
        assert_eq!(chain.apply_chain(&input).expect("apply"), input);
    }

    #[test]
    fn add_returns_position_and_defaults_name() {
        let mut chain = EffectChain::new();
        assert_eq!(chain.add_effect(Box::new(Delay::new(48_000)), None, 1.0), 0);
        assert_eq!(
            chain.add_effect(Box::new(Compressor::new(48_000)), Some("Glue"), 2.0),
            1
        );
        assert_eq!(names(&chain), vec!["Delay", "Glue"]);
        assert_eq!(chain.slot(1).map(|s| s.wet()), Some(1.0));
    }

    #[test]
    fn bypass_skips_effect_but_zero_wet_still_runs_it() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = EffectChain::new();
        chain.add_effect(Scale::boxed(2.0, &calls), None, 1.0);
        chain.set_bypass(0, true).expect("bypass");

        let input = vec![0.25; 16];
        assert_eq!(chain.apply_chain(&input).expect("apply"), input);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        chain.set_bypass(0, false).expect("bypass");
        chain.set_wet(0, 0.0).expect("wet");
        assert_eq!(chain.apply_chain(&input).expect("apply"), input);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn wet_blends_linearly() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = EffectChain::new();
        chain.add_effect(Scale::boxed(3.0, &calls), None, 0.25);
        let output = chain.apply_chain(&[0.4]).expect("apply");
        assert!(approx_eq(output[0], 0.4 * 0.75 + 1.2 * 0.25, 1e-6));
    }

    #[test]
    fn full_wet_returns_effect_output_exactly() {
        let mut chain = EffectChain::new();
        chain.add_effect(Box::new(Delay::new(1_000)), None, 1.0);
        let mut reference = Delay::new(1_000);
        let input: Vec<f32> = (0..700).map(|i| ((i as f32) * 0.3).sin()).collect();
        assert_eq!(
            chain.apply_chain(&input).expect("chain"),
            reference.apply(&input).expect("effect")
        );
    }

    #[test]
    fn wet_is_clamped_and_non_finite_ignored() {
        let mut chain = abc_chain();
        chain.set_wet(0, 1.7).expect("wet");
        assert_eq!(chain.slot(0).map(|s| s.wet()), Some(1.0));
        chain.set_wet(0, 0.4).expect("wet");
        chain.set_wet(0, f32::NAN).expect("wet");
        assert_eq!(chain.slot(0).map(|s| s.wet()), Some(0.4));
        chain.set_wet(1, -3.0).expect("wet");
        assert_eq!(chain.slot(1).map(|s| s.wet()), Some(0.0));
    }

    #[test]
    fn move_preserves_relative_order_and_restores() {
        let mut chain = abc_chain();
        chain.move_effect(0, 2).expect("move");
        assert_eq!(names(&chain), vec!["B", "C", "A"]);
        chain.move_effect(2, 0).expect("move back");
        assert_eq!(names(&chain), vec!["A", "B", "C"]);
        chain.move_effect(1, 1).expect("noop");
        assert_eq!(names(&chain), vec!["A", "B", "C"]);
    }

    #[test]
    fn move_rejects_out_of_range_indices() {
        let mut chain = abc_chain();
        let err = chain.move_effect(0, 3).unwrap_err();
        assert!(matches!(err, ChainError::IndexOutOfRange { index: 3, len: 3 }));
        assert_eq!(names(&chain), vec!["A", "B", "C"]);
    }

    #[test]
    fn remove_out_of_range_leaves_chain_unchanged() {
        let mut chain = abc_chain();
        assert!(chain.remove_effect(5).is_err());
        assert_eq!(chain.len(), 3);

        let removed = chain.remove_effect(1).expect("remove");
        assert_eq!(removed.name(), "B");
        assert_eq!(names(&chain), vec!["A", "C"]);

        chain.clear_effects();
        assert!(chain.is_empty());
        assert!(chain.remove_effect(0).is_err());
    }

    #[test]
    fn length_mismatch_is_reported() {
        let mut chain = EffectChain::new();
        chain.add_effect(Box::new(Truncate), None, 1.0);
        let err = chain.apply_chain(&[0.0; 8]).unwrap_err();
        assert!(matches!(
            err,
            ChainError::LengthMismatch {
                index: 0,
                expected: 8,
                actual: 7,
                ..
            }
        ));
    }

    #[test]
    fn order_matters_for_eq_and_compressor() {
        let boost: ParameterMap = [("band1_gain_db".to_string(), 24.0)].into_iter().collect();
        let squash: ParameterMap = [
            ("threshold".to_string(), -20.0),
            ("ratio".to_string(), 20.0),
            ("attack_ms".to_string(), 0.1),
        ]
        .into_iter()
        .collect();

        let build = |eq_first: bool| {
            let mut chain = EffectChain::new();
            let mut eq = Equalizer::new(48_000);
            eq.set_parameters(&boost);
            let mut comp = Compressor::new(48_000);
            comp.set_parameters(&squash);
            if eq_first {
                chain.add_effect(Box::new(eq), None, 1.0);
                chain.add_effect(Box::new(comp), None, 1.0);
            } else {
                chain.add_effect(Box::new(comp), None, 1.0);
                chain.add_effect(Box::new(eq), None, 1.0);
            }
            chain
        };

        // 1 kHz at about -34 dBFS: under the threshold until the band boost.
        let input: Vec<f32> = (0..4_800)
            .map(|i| (2.0 * std::f32::consts::PI * 1_000.0 * i as f32 / 48_000.0).sin() * 0.02)
            .collect();

        let mut comp = Compressor::new(48_000);
        comp.set_parameters(&squash);
        assert_eq!(comp.apply(&input).expect("comp"), input);

        let mut eq = Equalizer::new(48_000);
        eq.set_parameters(&boost);
        let boosted = eq.apply(&input).expect("eq");

        let eq_first = build(true).apply_chain(&input).expect("eq first");
        let comp_first = build(false).apply_chain(&input).expect("comp first");
        assert_eq!(comp_first, boosted);

        let rms = |samples: &[f32]| {
            let tail = &samples[2_400..];
            (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt()
        };
        assert!(rms(&comp_first) > 0.15, "boost rms {}", rms(&comp_first));
        assert!(
            rms(&eq_first) < 0.6 * rms(&comp_first),
            "compressed rms {} vs boosted {}",
            rms(&eq_first),
            rms(&comp_first)
        );
    }

    #[test]
    fn set_parameters_reaches_the_effect() {
        let mut chain = EffectChain::new();
        chain.add_effect(Box::new(Delay::new(48_000)), None, 1.0);
        let params: ParameterMap = [("feedback".to_string(), 0.6)].into_iter().collect();
        chain.set_parameters(0, &params).expect("params");
        let feedback = chain
            .slot(0)
            .and_then(|s| s.effect().parameters().get("feedback").copied());
        assert_eq!(feedback, Some(0.6));
        assert!(chain.set_parameters(1, &params).is_err());
    }
}
