//! Window rendering: clip summation, per-track effect chains and the master mix.
//!
//! The clip layout is supplied by a [`Timeline`] collaborator. Rendering sums
//! every clip overlapping the window into a per-track buffer, runs each
//! track's [`EffectChain`] over its buffer, applies track volume and adds the
//! result into a master buffer clamped to `[-1, 1]`.

use std::collections::BTreeMap;

use log::warn;

use crate::chain::EffectChain;
use crate::error::RenderError;

pub mod session;
pub mod timeline;

pub use session::{export_offline, RenderSession};
pub use timeline::{BufferClip, ClipTimeline};

const MAX_TRACK_VOLUME: f32 = 2.0;

/// A placed piece of audio that can hand out samples for a time range.
pub trait TimelineClip {
    /// Placement start on the timeline, in seconds.
    fn start_time(&self) -> f64;

    /// Placement end on the timeline, in seconds.
    fn end_time(&self) -> f64;

    /// Samples covering `[from, to)` in clip-local seconds.
    ///
    /// The renderer always asks for whole-frame bounds measured from the
    /// clip's start frame. The result is already scaled by any clip gain and
    /// has `(to - from) * sample_rate` samples; it may be shorter at the clip
    /// end.
    fn slice_samples(&self, from: f64, to: f64) -> Vec<f32>;
}

/// Source of clip placements.
pub trait Timeline {
    /// Every `(track_index, clip)` whose placement overlaps `[start, end)`.
    fn clips_for_range(&self, start: f64, end: f64) -> Vec<(usize, &dyn TimelineClip)>;
}

/// A mixer track: display name, volume and its effect chain.
#[derive(Debug)]
pub struct Track {
    pub name: String,
    pub effects: EffectChain,
    volume: f32,
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            effects: EffectChain::new(),
            volume: 1.0,
        }
    }

    pub fn with_chain(name: impl Into<String>, effects: EffectChain) -> Self {
        Self {
            effects,
            ..Self::new(name)
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the track volume, clamped to `[0, 2]`. Non-finite input is ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            warn!("track \"{}\": ignoring non-finite volume", self.name);
            return;
        }
        self.volume = volume.clamp(0.0, MAX_TRACK_VOLUME);
    }
}

/// Ordered collection of tracks; a track's index is its position.
#[derive(Debug, Default)]
pub struct Project {
    pub tracks: Vec<Track>,
}

impl Project {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a track and return its index.
    pub fn add_track(&mut self, track: Track) -> usize {
        self.tracks.push(track);
        self.tracks.len() - 1
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    /// Clear the effect state of every track.
    pub fn reset_effects(&mut self) {
        for track in &mut self.tracks {
            track.effects.reset_state();
        }
    }
}

/// Render `[start_time, start_time + duration)` to a mono master buffer.
///
/// # Arguments
/// - `timeline`: Clip layout.
/// - `start_time`: Window start in seconds, snapped to the nearest frame.
/// - `duration`: Window length in seconds.
/// - `sample_rate`: Output sample rate.
/// - `track_volumes`: Per-track volume overrides.
/// - `project`: When present, track effect chains run and track volumes apply.
///   Without it no effect is invoked.
///
/// # Returns
/// `round(duration * sample_rate)` samples in `[-1, 1]`. A non-positive
/// duration or a zero sample rate yields an empty buffer.
pub fn render_window(
    timeline: &dyn Timeline,
    start_time: f64,
    duration: f64,
    sample_rate: u32,
    track_volumes: &BTreeMap<usize, f32>,
    project: Option<&mut Project>,
) -> Result<Vec<f32>, RenderError> {
    if !start_time.is_finite() || !duration.is_finite() {
        return Err(RenderError::InvalidWindow(format!(
            "start {} / duration {} must be finite",
            start_time, duration
        )));
    }
    if duration <= 0.0 || sample_rate == 0 {
        return Ok(Vec::new());
    }
    let frames = (duration * sample_rate as f64).round() as usize;
    render_frames(
        timeline,
        start_time,
        frames,
        sample_rate,
        track_volumes,
        project,
    )
}

/// Render exactly `frames` samples starting at `start_time`.
///
/// Frame-exact variant of [`render_window`] used by sessions so consecutive
/// windows tile without rounding drift.
pub fn render_frames(
    timeline: &dyn Timeline,
    start_time: f64,
    frames: usize,
    sample_rate: u32,
    track_volumes: &BTreeMap<usize, f32>,
    mut project: Option<&mut Project>,
) -> Result<Vec<f32>, RenderError> {
    if !start_time.is_finite() {
        return Err(RenderError::InvalidWindow(format!(
            "start {} must be finite",
            start_time
        )));
    }
    if frames == 0 || sample_rate == 0 {
        return Ok(Vec::new());
    }

    let rate = sample_rate as f64;
    let window_start = (start_time * rate).round() as i64;
    let window_end = window_start + frames as i64;
    let mut track_buffers: BTreeMap<usize, Vec<f32>> = BTreeMap::new();

    // One frame of slack either side; the frame overlap below decides.
    let query_start = (window_start - 1) as f64 / rate;
    let query_end = (window_end + 1) as f64 / rate;
    for (track, clip) in timeline.clips_for_range(query_start, query_end) {
        // Placement snaps to a whole frame once, so every window slices the
        // clip against the same grid.
        let clip_start = (clip.start_time() * rate).round() as i64;
        let clip_end =
            clip_start + ((clip.end_time() - clip.start_time()) * rate).round() as i64;
        let overlap_start = clip_start.max(window_start);
        let overlap_end = clip_end.min(window_end);
        if overlap_end <= overlap_start {
            continue;
        }

        let local = clip.slice_samples(
            (overlap_start - clip_start) as f64 / rate,
            (overlap_end - clip_start) as f64 / rate,
        );
        let offset = (overlap_start - window_start) as usize;
        let buffer = track_buffers
            .entry(track)
            .or_insert_with(|| vec![0.0; frames]);
        for (dst, src) in buffer.iter_mut().skip(offset).zip(local.iter()) {
            *dst += *src;
        }
    }

    if let Some(project) = project.as_deref() {
        for (index, track) in project.tracks.iter().enumerate() {
            if !track.effects.is_empty() {
                track_buffers
                    .entry(index)
                    .or_insert_with(|| vec![0.0; frames]);
            }
        }
    }

    let mut master = vec![0.0_f32; frames];
    for (index, mut buffer) in track_buffers {
        let track = project
            .as_deref_mut()
            .and_then(|project| project.tracks.get_mut(index));

        let override_volume = match track_volumes.get(&index) {
            Some(volume) if !volume.is_finite() => {
                warn!("track {}: ignoring non-finite volume override", index);
                None
            }
            other => other.copied(),
        };
        let volume = match (override_volume, track.as_deref()) {
            (Some(volume), _) => volume,
            (None, Some(track)) => track.volume(),
            (None, None) => 1.0,
        };

        if let Some(track) = track {
            if !track.effects.is_empty() {
                track.effects.prepare(sample_rate);
                buffer = track
                    .effects
                    .apply_chain(&buffer)
                    .map_err(|source| RenderError::Chain {
                        track: index,
                        source,
                    })?;
            }
        }

        for (dst, src) in master.iter_mut().zip(buffer.iter()) {
            *dst += *src * volume;
        }
    }

    for sample in &mut master {
        *sample = sample.clamp(-1.0, 1.0);
    }
    Ok(master)
}
