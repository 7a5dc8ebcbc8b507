//! JSON render manifest: tracks with effect chains plus clip placements.

use serde::{Deserialize, Serialize};
use trackfx_lib::chain::EffectChain;
use trackfx_lib::config::{EffectConfig, EffectRegistry};
use trackfx_lib::error::ConfigError;
use trackfx_lib::render::{BufferClip, ClipTimeline, Project, Track};

fn default_sample_rate() -> u32 {
    44_100
}

fn default_gain() -> f32 {
    1.0
}

fn default_tail_seconds() -> f64 {
    1.0
}

/// Serialized render job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderManifest {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    /// Extra time rendered after the last clip so effect tails can ring out.
    #[serde(default = "default_tail_seconds")]
    pub tail_seconds: f64,
    #[serde(default)]
    pub tracks: Vec<TrackManifest>,
    #[serde(default)]
    pub clips: Vec<ClipManifest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackManifest {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_gain")]
    pub volume: f32,
    #[serde(default)]
    pub effects: Vec<EffectConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipManifest {
    pub track: usize,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default = "default_gain")]
    pub gain: f32,
    pub source: ClipSource,
}

/// Clip audio, synthesized at the render sample rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClipSource {
    /// A single sample of `amplitude` followed by silence.
    Impulse { seconds: f64, amplitude: f32 },
    Tone {
        freq_hz: f32,
        seconds: f64,
        amplitude: f32,
    },
    /// Literal samples at the render sample rate.
    Samples { samples: Vec<f32> },
}

impl ClipSource {
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let frames = |seconds: f64| (seconds.max(0.0) * sample_rate as f64).round() as usize;
        match self {
            Self::Impulse { seconds, amplitude } => {
                let mut samples = vec![0.0; frames(*seconds).max(1)];
                samples[0] = *amplitude;
                samples
            }
            Self::Tone {
                freq_hz,
                seconds,
                amplitude,
            } => (0..frames(*seconds))
                .map(|i| {
                    let t = i as f32 / sample_rate as f32;
                    (2.0 * std::f32::consts::PI * freq_hz * t).sin() * amplitude
                })
                .collect(),
            Self::Samples { samples } => samples.clone(),
        }
    }
}

impl RenderManifest {
    /// Build the timeline and project described by the manifest.
    ///
    /// Effect chains are loaded through `registry`; an unknown effect type on
    /// any track fails the whole build.
    pub fn build(
        &self,
        registry: &EffectRegistry,
        sample_rate: u32,
    ) -> Result<(ClipTimeline, Project), ConfigError> {
        let mut project = Project::new();
        for (index, track) in self.tracks.iter().enumerate() {
            let chain = EffectChain::from_config(&track.effects, registry, sample_rate)?;
            let name = if track.name.is_empty() {
                format!("Track {}", index + 1)
            } else {
                track.name.clone()
            };
            let mut built = Track::with_chain(name, chain);
            built.set_volume(track.volume);
            project.add_track(built);
        }

        let mut timeline = ClipTimeline::new();
        for (index, clip) in self.clips.iter().enumerate() {
            let samples = clip.source.render(sample_rate);
            let buffer = BufferClip::new(
                format!("clip {}", index + 1),
                samples,
                sample_rate,
                clip.start_time,
            )
            .with_gain(clip.gain);
            timeline.add_clip(clip.track, buffer);
        }

        Ok((timeline, project))
    }
}

/// Example manifest printed by `create manifest-json`.
pub fn default_manifest() -> RenderManifest {
    let mut delay = EffectConfig::new("Delay");
    delay.wet = 0.8;
    delay.parameters.insert("delay_time_ms".to_string(), 250.0);
    delay.parameters.insert("feedback".to_string(), 0.4);

    let mut reverb = EffectConfig::new("Reverb");
    reverb.parameters.insert("mix".to_string(), 0.3);

    RenderManifest {
        sample_rate: default_sample_rate(),
        tail_seconds: default_tail_seconds(),
        tracks: vec![
            TrackManifest {
                name: "Drums".to_string(),
                volume: 0.9,
                effects: vec![EffectConfig::new("Compressor"), delay],
            },
            TrackManifest {
                name: "Keys".to_string(),
                volume: 0.7,
                effects: vec![EffectConfig::new("Equalizer"), reverb],
            },
        ],
        clips: vec![
            ClipManifest {
                track: 0,
                start_time: 0.0,
                gain: 1.0,
                source: ClipSource::Impulse {
                    seconds: 0.5,
                    amplitude: 0.9,
                },
            },
            ClipManifest {
                track: 1,
                start_time: 0.25,
                gain: 0.8,
                source: ClipSource::Tone {
                    freq_hz: 440.0,
                    seconds: 1.0,
                    amplitude: 0.5,
                },
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trackfx_lib::render::Timeline;

    #[test]
    fn default_manifest_builds() {
        let manifest = default_manifest();
        let json = serde_json::to_string(&manifest).expect("serialize");
        let decoded: RenderManifest = serde_json::from_str(&json).expect("deserialize");
        let registry = EffectRegistry::with_builtin_effects();
        let (timeline, project) = decoded.build(&registry, 8_000).expect("build");
        assert_eq!(project.tracks.len(), 2);
        assert_eq!(project.tracks[0].effects.len(), 2);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.clips_for_range(0.0, 0.1).len(), 1);
    }

    #[test]
    fn minimal_manifest_uses_defaults() {
        let json = r#"{
            "tracks": [{"effects": [{"type": "Delay"}]}],
            "clips": [{"track": 0, "source": {"type": "samples", "samples": [0.5, 0.25]}}]
        }"#;
        let manifest: RenderManifest = serde_json::from_str(json).expect("manifest");
        assert_eq!(manifest.sample_rate, 44_100);
        assert_eq!(manifest.tracks[0].volume, 1.0);
        assert_eq!(manifest.clips[0].gain, 1.0);

        let registry = EffectRegistry::with_builtin_effects();
        let (_, project) = manifest.build(&registry, 44_100).expect("build");
        assert_eq!(project.tracks[0].name, "Track 1");
    }

    #[test]
    fn impulse_source_has_one_non_zero_sample() {
        let samples = ClipSource::Impulse {
            seconds: 0.01,
            amplitude: 0.7,
        }
        .render(1_000);
        assert_eq!(samples.len(), 10);
        assert_eq!(samples[0], 0.7);
        assert!(samples[1..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn unknown_effect_fails_build() {
        let json = r#"{"tracks": [{"effects": [{"type": "Chorus"}]}]}"#;
        let manifest: RenderManifest = serde_json::from_str(json).expect("manifest");
        let registry = EffectRegistry::with_builtin_effects();
        assert!(manifest.build(&registry, 44_100).is_err());
    }
}
