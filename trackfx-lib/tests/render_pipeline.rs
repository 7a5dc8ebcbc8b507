use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trackfx_lib::chain::EffectChain;
use trackfx_lib::config::{EffectConfig, EffectRegistry};
use trackfx_lib::dsp::effects::{Delay, Effect, ParamRange, ParameterMap};
use trackfx_lib::error::{EffectError, RenderError};
use trackfx_lib::render::{
    export_offline, render_window, BufferClip, ClipTimeline, Project, Track,
};

/// Pass-through effect that counts how often it runs.
#[derive(Debug)]
struct Counter {
    calls: Arc<AtomicUsize>,
}

impl Effect for Counter {
    fn type_name(&self) -> &'static str {
        "Counter"
    }
    fn sample_rate(&self) -> u32 {
        1_000
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
        Ok(input.to_vec())
    }
    fn reset_state(&mut self) {}
}

/// Always fails.
#[derive(Debug)]
struct Broken;

impl Effect for Broken {
    fn type_name(&self) -> &'static str {
        "Broken"
    }
    fn sample_rate(&self) -> u32 {
        1_000
    }
    fn set_sample_rate(&mut self, _sample_rate: u32) {}
    fn parameter_range(&self, _name: &str) -> Option<ParamRange> {
        None
    }
    fn parameters(&self) -> ParameterMap {
        ParameterMap::new()
    }
    fn set_parameters(&mut self, _params: &ParameterMap) {}
    fn apply(&mut self, _input: &[f32]) -> Result<Vec<f32>, EffectError> {
        Err(EffectError::Processing("boom".to_string()))
    }
    fn reset_state(&mut self) {}
}

fn impulse_timeline() -> ClipTimeline {
    let mut samples = vec![0.0; 1_000];
    samples[0] = 1.0;
    let mut timeline = ClipTimeline::new();
    timeline.add_clip(0, BufferClip::new("impulse", samples, 1_000, 0.0));
    timeline
}

fn delay_project(bypass: bool) -> Project {
    let params: ParameterMap = [
        ("delay_time_ms".to_string(), 500.0),
        ("feedback".to_string(), 0.0),
        ("mix".to_string(), 1.0),
    ]
    .into_iter()
    .collect();
    let mut chain = EffectChain::new();
    chain.add_effect(Box::new(Delay::with_parameters(1_000, &params)), None, 1.0);
    chain.set_bypass(0, bypass).expect("bypass");

    let mut project = Project::new();
    project.add_track(Track::with_chain("drums", chain));
    project
}

#[test]
fn delayed_impulse_lands_after_delay_time() {
    let timeline = impulse_timeline();
    let mut project = delay_project(false);
    let out = render_window(&timeline, 0.0, 1.0, 1_000, &BTreeMap::new(), Some(&mut project))
        .expect("render");

    assert_eq!(out.len(), 1_000);
    assert_eq!(out[0], 0.0);
    assert_eq!(out[500], 1.0);
    let others: f32 = out
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 500)
        .map(|(_, s)| s.abs())
        .sum();
    assert_eq!(others, 0.0);
}

#[test]
fn bypassed_delay_renders_dry_signal() {
    let timeline = impulse_timeline();
    let mut project = delay_project(true);
    let out = render_window(&timeline, 0.0, 1.0, 1_000, &BTreeMap::new(), Some(&mut project))
        .expect("render");
    assert_eq!(out[0], 1.0);
    assert!(out[1..].iter().all(|&s| s == 0.0));
}

#[test]
fn rendering_without_project_runs_no_effects() {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut project = Project::new();
    let mut track = Track::new("counter");
    track.effects.add_effect(
        Box::new(Counter {
            calls: Arc::clone(&calls),
        }),
        None,
        1.0,
    );
    project.add_track(track);

    let timeline = impulse_timeline();
    let raw = render_window(&timeline, 0.0, 0.1, 1_000, &BTreeMap::new(), None).expect("raw");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(raw[0], 1.0);

    render_window(&timeline, 0.0, 0.1, 1_000, &BTreeMap::new(), Some(&mut project))
        .expect("with effects");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn effect_tail_continues_on_track_without_clips() {
    let timeline = impulse_timeline();
    let mut project = delay_project(false);
    let first = render_window(&timeline, 0.0, 0.4, 1_000, &BTreeMap::new(), Some(&mut project))
        .expect("first");
    assert!(first.iter().all(|&s| s == 0.0));

    let empty = ClipTimeline::new();
    let second = render_window(&empty, 0.4, 0.4, 1_000, &BTreeMap::new(), Some(&mut project))
        .expect("second");
    assert_eq!(second[100], 1.0);
}

#[test]
fn chain_failure_aborts_render() {
    let mut chain = EffectChain::new();
    chain.add_effect(Box::new(Broken), None, 1.0);
    let mut project = Project::new();
    project.add_track(Track::with_chain("bad", chain));

    let err = render_window(
        &impulse_timeline(),
        0.0,
        0.1,
        1_000,
        &BTreeMap::new(),
        Some(&mut project),
    )
    .unwrap_err();
    assert!(matches!(err, RenderError::Chain { track: 0, .. }));
}

#[test]
fn loaded_chain_renders_like_the_original() {
    let registry = EffectRegistry::with_builtin_effects();
    let mut reverb = EffectConfig::new("Reverb");
    reverb.parameters.insert("mix".to_string(), 0.6);
    let mut eq = EffectConfig::new("Equalizer");
    eq.parameters.insert("band0_gain_db".to_string(), 6.0);
    eq.wet = 0.5;
    let configs = vec![eq, EffectConfig::new("Compressor"), reverb];

    let build = || {
        let chain = EffectChain::from_config(&configs, &registry, 1_000).expect("load");
        let mut project = Project::new();
        project.add_track(Track::with_chain("bus", chain));
        project
    };

    let timeline = impulse_timeline();
    let mut a = build();
    let mut b = build();
    let out_a = render_window(&timeline, 0.0, 0.5, 1_000, &BTreeMap::new(), Some(&mut a))
        .expect("a");
    let out_b = export_offline(&timeline, 0.0, 0.5, 1_000, 64, &BTreeMap::new(), Some(&mut b))
        .expect("b");
    assert_eq!(out_a, out_b);
    assert!(out_a.iter().all(|s| (-1.0..=1.0).contains(s)));
}
