//! Screenshot request queue
//!
//! Records the intent to grab a still frame at a given offset. Requests are
//! resolved into images only after the video is finalized.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapturePhase {
    Start,
    End,
}

impl fmt::Display for CapturePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapturePhase::Start => write!(f, "start"),
            CapturePhase::End => write!(f, "end"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub index: u64,
    pub phase: CapturePhase,
    pub offset_secs: f64,
}

impl CaptureRequest {
    /// `{index}_{phase}_{milliseconds}.png`
    pub fn file_name(&self) -> String {
        let ms = (self.offset_secs.max(0.0) * 1000.0) as u64;
        format!("{}_{}_{}.png", self.index, self.phase, ms)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CaptureQueue {
    enabled: bool,
    requests: Vec<CaptureRequest>,
}

impl CaptureQueue {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            requests: Vec::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// No-op unless capture mode is enabled
    pub fn request(&mut self, index: u64, phase: CapturePhase, offset_secs: f64) {
        if !self.enabled {
            return;
        }
        tracing::trace!("Capture request {} {} @ {:.3}s", index, phase, offset_secs);
        self.requests.push(CaptureRequest {
            index,
            phase,
            offset_secs,
        });
    }

    /// Drop every request made for `index`
    pub fn retract(&mut self, index: u64) {
        self.requests.retain(|request| request.index != index);
    }

    pub fn requests(&self) -> &[CaptureRequest] {
        &self.requests
    }

    pub fn take(&mut self) -> Vec<CaptureRequest> {
        std::mem::take(&mut self.requests)
    }
}
