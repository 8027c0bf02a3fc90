//! Timestamp alignment onto the recorded video's frame grid
//!
//! Engine offsets are measured from the engine origin. The video starts a
//! little later (recorder startup), so every offset is shifted by the video's
//! first-frame time and snapped to the nearest frame boundary, which lets the
//! frame extractor retrieve exactly that frame.

use crate::action::ActionLog;
use crate::capture::screenshot::{CapturePhase, CaptureRequest};
use crate::engine::EngineOutput;

/// Frame grid of a finished recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGrid {
    /// First frame's presentation time, relative to the engine origin
    pub video_t0: f64,
    pub fps: f64,
}

impl FrameGrid {
    pub fn new(video_t0: f64, fps: f64) -> Self {
        Self { video_t0, fps }
    }

    /// `round((raw - t0) * fps) / fps`, clamped at zero
    pub fn snap(&self, raw: f64) -> f64 {
        non_negative(((raw - self.video_t0) * self.fps).round() / self.fps)
    }

    /// Shifted onto the video timeline without snapping
    pub fn shift(&self, raw: f64) -> f64 {
        non_negative(raw - self.video_t0)
    }

    pub fn align_actions(&self, log: &mut ActionLog) {
        for action in log.iter_mut() {
            action.start = self.snap(action.start);
            action.end = self.snap(action.end);
        }
        log.sort_by_capture_index();
    }

    /// Start captures are snapped like actions; end captures keep the
    /// natural moment the action concluded
    pub fn align_captures(&self, requests: &mut [CaptureRequest]) {
        for request in requests.iter_mut() {
            request.offset_secs = match request.phase {
                CapturePhase::Start => self.snap(request.offset_secs),
                CapturePhase::End => self.shift(request.offset_secs),
            };
        }
    }
}

fn non_negative(value: f64) -> f64 {
    if value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Align everything the engine produced. Without a first-frame time the
/// offset falls back to zero, giving an un-synced but usable log.
/// Returns the grid that was applied.
pub fn align_output(output: &mut EngineOutput, video_t0: Option<f64>, fps: u32) -> FrameGrid {
    let video_t0 = match video_t0 {
        Some(t0) if t0.is_finite() => t0,
        _ => {
            tracing::warn!("Video first-frame time unavailable, aligning with zero offset");
            0.0
        }
    };
    let grid = FrameGrid::new(video_t0, f64::from(fps.max(1)));

    grid.align_actions(&mut output.actions);
    grid.align_captures(&mut output.captures);

    tracing::info!(
        "Aligned {} actions and {} capture requests (video_t0={:.3}s, fps={})",
        output.actions.len(),
        output.captures.len(),
        grid.video_t0,
        grid.fps
    );
    grid
}
