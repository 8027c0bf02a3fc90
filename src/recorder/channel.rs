//! Collaborator traits
//!
//! Defines the interface to the processes the action engine depends on but
//! does not own: the video recorder and the still-frame extractor.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur around a recording session
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Process error: {0}")]
    ProcessError(String),

    #[error("Probe error: {0}")]
    ProbeError(String),

    #[error("Frame extraction error: {0}")]
    ExtractionError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;

/// Where and how the video recorder should write
#[derive(Debug, Clone, PartialEq)]
pub struct VideoTarget {
    /// Final video path (e.g. `recording.mp4`)
    pub path: PathBuf,

    /// Capture frame rate
    pub fps: u32,

    /// Burn an on-screen running timer into the video
    pub timer_overlay: bool,

    /// Unix time (seconds) of the engine origin, used to express the first
    /// frame's timestamp relative to the origin
    pub origin_unix_secs: f64,
}

/// Screen recorder driven by a session
///
/// Implementations own the recording process. The session only asks them to
/// start, stop, and report when their first frame was presented.
#[async_trait]
pub trait VideoRecorder: Send + Sync {
    /// Start recording to the given target
    async fn start(&mut self, target: &VideoTarget) -> RecordingResult<()>;

    /// Stop recording and finalize the video file
    async fn stop(&mut self) -> RecordingResult<()>;

    /// Presentation time of the first frame, in seconds relative to the
    /// engine origin. `None` when it cannot be determined.
    async fn first_frame_offset(&self) -> Option<f64>;

    /// Path of the finalized video, once started
    fn output_path(&self) -> Option<&Path>;
}

/// Extracts single still images from a finished video
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Write the frame at `offset_secs` of `video` to `dest`
    async fn extract(&self, video: &Path, offset_secs: f64, dest: &Path) -> RecordingResult<()>;
}
