//! Synthetic effect-chain benchmarks.

use rand::Rng;

use crate::chain::EffectChain;
use crate::config::EffectRegistry;

/// Configuration parameters for a chain benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct ChainBenchConfig {
    pub sample_rate: u32,
    pub block_frames: usize,
    pub blocks: usize,
    pub iterations: usize,
}

impl Default for ChainBenchConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            block_frames: 512,
            blocks: 200,
            iterations: 5,
        }
    }
}

/// Per-block timing results from a benchmark run.
#[derive(Debug, Clone, Copy)]
pub struct ChainBenchResult {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub audio_time_ms: f64,
    pub rt_factor: f64,
    pub slots: usize,
}

/// Time one slot of every built-in effect over random noise, block by block.
pub fn bench_chain(config: ChainBenchConfig) -> ChainBenchResult {
    let sample_rate = config.sample_rate.max(1);
    let block_frames = config.block_frames.max(1);
    let registry = EffectRegistry::with_builtin_effects();

    let mut chain = EffectChain::new();
    for type_name in registry.type_names() {
        if let Some(effect) = registry.create(type_name, sample_rate) {
            chain.add_effect(effect, None, 1.0);
        }
    }

    let mut rng = rand::thread_rng();
    let noise: Vec<f32> = (0..block_frames)
        .map(|_| rng.gen_range(-1.0_f32..1.0_f32))
        .collect();

    let mut times: Vec<f64> = Vec::with_capacity(config.iterations.max(1) * config.blocks.max(1));
    for _ in 0..config.iterations.max(1) {
        chain.reset_state();
        for _ in 0..config.blocks.max(1) {
            let start = std::time::Instant::now();
            let _ = chain.apply_chain(&noise);
            times.push(start.elapsed().as_secs_f64() * 1000.0);
        }
    }

    let min_ms = times
        .iter()
        .copied()
        .fold(f64::INFINITY, |a, b| a.min(b));
    let max_ms = times.iter().copied().fold(0.0_f64, |a, b| a.max(b));
    let avg_ms = times.iter().sum::<f64>() / times.len() as f64;
    let audio_time_ms = (block_frames as f64 / sample_rate as f64) * 1000.0;
    let rt_factor = if audio_time_ms > 0.0 {
        avg_ms / audio_time_ms
    } else {
        0.0
    };

    ChainBenchResult {
        avg_ms,
        min_ms: if min_ms.is_finite() { min_ms } else { 0.0 },
        max_ms,
        audio_time_ms,
        rt_factor,
        slots: chain.len(),
    }
}
