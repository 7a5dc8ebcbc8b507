//! In-memory clip timeline.

use super::{Timeline, TimelineClip};

/// A block of mono samples placed at a fixed timeline position.
///
/// Samples are expected at the render sample rate; no resampling is done.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferClip {
    pub name: String,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub start_time: f64,
    pub gain: f32,
}

impl BufferClip {
    pub fn new(name: impl Into<String>, samples: Vec<f32>, sample_rate: u32, start_time: f64) -> Self {
        Self {
            name: name.into(),
            samples,
            sample_rate: sample_rate.max(1),
            start_time,
            gain: 1.0,
        }
    }

    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    fn index_at(&self, seconds: f64) -> usize {
        let index = (seconds * self.sample_rate as f64).round();
        if index <= 0.0 {
            0
        } else {
            (index as usize).min(self.samples.len())
        }
    }
}

impl TimelineClip for BufferClip {
    fn start_time(&self) -> f64 {
        self.start_time
    }

    fn end_time(&self) -> f64 {
        self.start_time + self.duration()
    }

    fn slice_samples(&self, from: f64, to: f64) -> Vec<f32> {
        let start = self.index_at(from);
        let end = self.index_at(to).max(start);
        self.samples[start..end]
            .iter()
            .map(|sample| sample * self.gain)
            .collect()
    }
}

/// Clip placements keyed by track index.
#[derive(Debug, Clone, Default)]
pub struct ClipTimeline {
    placements: Vec<(usize, BufferClip)>,
}

impl ClipTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clip(&mut self, track: usize, clip: BufferClip) {
        self.placements.push((track, clip));
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Timeline end: the latest clip end, or 0 when empty.
    pub fn end_time(&self) -> f64 {
        self.placements
            .iter()
            .map(|(_, clip)| clip.end_time())
            .fold(0.0, f64::max)
    }
}

impl Timeline for ClipTimeline {
    fn clips_for_range(&self, start: f64, end: f64) -> Vec<(usize, &dyn TimelineClip)> {
        self.placements
            .iter()
            .filter(|(_, clip)| clip.end_time() > start && clip.start_time() < end)
            .map(|(track, clip)| (*track, clip as &dyn TimelineClip))
            .collect()
    }
}
