//! Ordered windowed rendering for playback and offline export.
//!
//! Effects carry state from one block to the next, so windows rendered
//! through a chain must be consecutive and non-overlapping. A
//! [`RenderSession`] keeps the playhead as an integer frame count and only
//! moves it forward by whole windows; jumping elsewhere goes through
//! [`RenderSession::seek`], which clears effect state.

use std::collections::BTreeMap;

use log::debug;

use super::{render_frames, Project, Timeline};
use crate::error::RenderError;

/// Playhead for consecutive window rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSession {
    sample_rate: u32,
    position_frames: i64,
}

impl RenderSession {
    /// A session at time zero.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            position_frames: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn position_frames(&self) -> i64 {
        self.position_frames
    }

    pub fn position_seconds(&self) -> f64 {
        self.position_frames as f64 / self.sample_rate as f64
    }

    /// Render the next `frames` samples and advance the playhead by exactly
    /// that many frames.
    pub fn render_next(
        &mut self,
        timeline: &dyn Timeline,
        frames: usize,
        track_volumes: &BTreeMap<usize, f32>,
        project: Option<&mut Project>,
    ) -> Result<Vec<f32>, RenderError> {
        let block = render_frames(
            timeline,
            self.position_seconds(),
            frames,
            self.sample_rate,
            track_volumes,
            project,
        )?;
        self.position_frames += frames as i64;
        Ok(block)
    }

    /// Jump to `time` seconds. Every chain in `project` loses its history,
    /// since audio before and after the jump is not continuous.
    pub fn seek(&mut self, time: f64, project: Option<&mut Project>) -> Result<(), RenderError> {
        if !time.is_finite() {
            return Err(RenderError::InvalidWindow(format!(
                "seek target {} must be finite",
                time
            )));
        }
        self.position_frames = (time * self.sample_rate as f64).round() as i64;
        if let Some(project) = project {
            project.reset_effects();
        }
        debug!(
            "session: seek to frame {} ({:.3}s)",
            self.position_frames,
            self.position_seconds()
        );
        Ok(())
    }
}

/// Render `[start_time, start_time + duration)` block by block.
///
/// Effect state is cleared before the first block, so the result equals a
/// single [`render_window`](super::render_window) call over the same range on
/// freshly reset chains.
///
/// # Arguments
/// - `block_frames`: Frames per block; clamped to at least one.
pub fn export_offline(
    timeline: &dyn Timeline,
    start_time: f64,
    duration: f64,
    sample_rate: u32,
    block_frames: usize,
    track_volumes: &BTreeMap<usize, f32>,
    mut project: Option<&mut Project>,
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

    let total_frames = (duration * sample_rate as f64).round() as usize;
    let block_frames = block_frames.max(1);
    let mut session = RenderSession::new(sample_rate);
    session.seek(start_time, project.as_deref_mut())?;

    let mut output = Vec::with_capacity(total_frames);
    while output.len() < total_frames {
        let frames = block_frames.min(total_frames - output.len());
        let block = session.render_next(timeline, frames, track_volumes, project.as_deref_mut())?;
        output.extend_from_slice(&block);
    }
    debug!(
        "export: {} frames in blocks of {} @ {} Hz",
        total_frames, block_frames, sample_rate
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::effects::{Delay, ParameterMap};
    use crate::render::{render_window, BufferClip, ClipTimeline, Track};

    fn echo_project() -> Project {
        let params: ParameterMap = [
            ("delay_time_ms".to_string(), 7.0),
            ("feedback".to_string(), 0.5),
            ("mix".to_string(), 0.5),
        ]
        .into_iter()
        .collect();
        let mut track = Track::new("echo");
        track
            .effects
            .add_effect(Box::new(Delay::with_parameters(1_000, &params)), None, 1.0);
        let mut project = Project::new();
        project.add_track(track);
        project
    }

    fn blip_timeline() -> ClipTimeline {
        let mut timeline = ClipTimeline::new();
        timeline.add_clip(0, BufferClip::new("blip", vec![0.9, -0.4, 0.2], 1_000, 0.003));
        timeline
    }

    #[test]
    fn playhead_advances_by_whole_frames() {
        let timeline = ClipTimeline::new();
        let mut session = RenderSession::new(48_000);
        for _ in 0..3 {
            session
                .render_next(&timeline, 441, &BTreeMap::new(), None)
                .expect("render");
        }
        assert_eq!(session.position_frames(), 1_323);
    }

    #[test]
    fn blocks_match_single_window() {
        let timeline = blip_timeline();
        let volumes = BTreeMap::new();

        let mut whole_project = echo_project();
        let whole = render_window(&timeline, 0.0, 0.05, 1_000, &volumes, Some(&mut whole_project))
            .expect("whole");

        let mut block_project = echo_project();
        let blocks = export_offline(&timeline, 0.0, 0.05, 1_000, 4, &volumes, Some(&mut block_project))
            .expect("blocks");

        assert_eq!(blocks.len(), 50);
        assert_eq!(blocks, whole);
        // Echo of the clip keeps ringing after the clip ends.
        assert!(blocks[10..].iter().any(|&s| s != 0.0));
    }

    #[test]
    fn clip_between_frames_survives_any_block_size() {
        let ramp = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let mut timeline = ClipTimeline::new();
        timeline.add_clip(0, BufferClip::new("ramp", ramp.clone(), 1_000, 0.0025));
        let volumes = BTreeMap::new();

        let whole = render_window(&timeline, 0.0, 0.012, 1_000, &volumes, None).expect("whole");
        let first = whole.iter().position(|&s| s != 0.0).expect("clip audible");
        assert!(first == 2 || first == 3);
        assert_eq!(&whole[first..first + 6], ramp.as_slice());
        assert!(whole[first + 6..].iter().all(|&s| s == 0.0));

        for block_frames in [1, 2, 3, 5, 12] {
            let blocks = export_offline(&timeline, 0.0, 0.012, 1_000, block_frames, &volumes, None)
                .expect("blocks");
            assert_eq!(blocks, whole, "block size {}", block_frames);
        }
    }

    #[test]
    fn window_start_between_frames_snaps_to_the_grid() {
        let timeline = blip_timeline();
        let volumes = BTreeMap::new();
        let aligned = render_window(&timeline, 0.002, 0.004, 1_000, &volumes, None).expect("aligned");
        let offset = render_window(&timeline, 0.0021, 0.004, 1_000, &volumes, None).expect("offset");
        assert_eq!(aligned, vec![0.0, 0.9, -0.4, 0.2]);
        assert_eq!(offset, aligned);
    }

    #[test]
    fn seek_resets_effect_state() {
        let timeline = blip_timeline();
        let volumes = BTreeMap::new();
        let mut project = echo_project();
        let mut session = RenderSession::new(1_000);

        session
            .render_next(&timeline, 8, &volumes, Some(&mut project))
            .expect("prime");
        session.seek(0.1, Some(&mut project)).expect("seek");
        assert_eq!(session.position_frames(), 100);

        let after = session
            .render_next(&timeline, 32, &volumes, Some(&mut project))
            .expect("render");
        assert!(after.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn seek_rejects_non_finite_time() {
        let mut session = RenderSession::new(1_000);
        assert!(session.seek(f64::INFINITY, None).is_err());
    }
}
