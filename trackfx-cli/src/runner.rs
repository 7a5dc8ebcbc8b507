use std::collections::BTreeMap;
use std::path::Path;

use clap::ArgMatches;
use log::{info, warn};
use trackfx_lib::config::{EffectConfig, EffectRegistry};
use trackfx_lib::render::{export_offline, Timeline};

use crate::cli;
use crate::error::CliError;
use crate::manifest::{default_manifest, RenderManifest};

pub fn run(args: &ArgMatches) -> Result<i32, CliError> {
    match args.subcommand() {
        Some(("render", render_args)) => run_render(render_args),
        Some(("create", create_args)) => run_create(create_args),
        Some(("bench", bench_args)) => cli::bench::run_bench(bench_args),
        _ => Err(CliError::InvalidArgument("missing subcommand".to_string())),
    }
}

fn run_create(args: &ArgMatches) -> Result<i32, CliError> {
    match args.subcommand() {
        Some(("effects-json", _)) => {
            let registry = EffectRegistry::with_builtin_effects();
            let configs: Vec<EffectConfig> = registry
                .type_names()
                .into_iter()
                .filter_map(|type_name| registry.create(type_name, registry_rate()))
                .map(|effect| {
                    let mut config = EffectConfig::new(effect.type_name());
                    config.parameters = effect.parameters();
                    config
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&configs)?);
            Ok(0)
        }
        Some(("manifest-json", _)) => {
            println!("{}", serde_json::to_string_pretty(&default_manifest())?);
            Ok(0)
        }
        _ => Err(CliError::InvalidArgument(
            "create needs effects-json or manifest-json".to_string(),
        )),
    }
}

fn registry_rate() -> u32 {
    trackfx_lib::dsp::effects::DEFAULT_SAMPLE_RATE
}

fn run_render(args: &ArgMatches) -> Result<i32, CliError> {
    let manifest_path = required_arg(args, "MANIFEST")?;
    let out_path = required_arg(args, "out")?;
    let start: f64 = parse_arg(args, "start")?.unwrap_or(0.0);
    let block_frames: usize = parse_arg(args, "block-frames")?.unwrap_or(512);
    let raw = args.get_flag("raw");

    let text = std::fs::read_to_string(manifest_path)?;
    let manifest: RenderManifest = serde_json::from_str(&text)?;
    let sample_rate: u32 = parse_arg(args, "sample-rate")?.unwrap_or(manifest.sample_rate);
    if sample_rate == 0 {
        return Err(CliError::InvalidArgument(
            "sample rate must be positive".to_string(),
        ));
    }

    let registry = EffectRegistry::with_builtin_effects();
    let (timeline, mut project) = manifest.build(&registry, sample_rate)?;
    for clip_track in clip_tracks(&timeline) {
        if clip_track >= project.tracks.len() {
            warn!("clip references missing track {}", clip_track);
        }
    }

    let duration: f64 = match parse_arg(args, "duration")? {
        Some(duration) => duration,
        None => (timeline.end_time() + manifest.tail_seconds.max(0.0) - start).max(0.0),
    };

    info!(
        "rendering {:.3}s from {:.3}s @ {} Hz ({} track(s), {} clip(s){})",
        duration,
        start,
        sample_rate,
        project.tracks.len(),
        timeline.len(),
        if raw { ", raw" } else { "" }
    );

    let volumes = BTreeMap::new();
    let samples = export_offline(
        &timeline,
        start,
        duration,
        sample_rate,
        block_frames,
        &volumes,
        if raw { None } else { Some(&mut project) },
    )?;

    write_wav(Path::new(out_path), &samples, sample_rate)?;
    info!("wrote {} frames to {}", samples.len(), out_path);
    Ok(0)
}

fn clip_tracks(timeline: &dyn Timeline) -> Vec<usize> {
    let mut tracks: Vec<usize> = timeline
        .clips_for_range(f64::MIN, f64::MAX)
        .into_iter()
        .map(|(track, _)| track)
        .collect();
    tracks.sort_unstable();
    tracks.dedup();
    tracks
}

fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), CliError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn required_arg<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str, CliError> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| CliError::InvalidArgument(format!("missing --{}", name)))
}

fn parse_arg<T: std::str::FromStr>(args: &ArgMatches, name: &str) -> Result<Option<T>, CliError> {
    match args.get_one::<String>(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| CliError::InvalidArgument(format!("{} = {:?}", name, value))),
        None => Ok(None),
    }
}
