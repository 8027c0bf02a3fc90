//! Recording session and the external processes behind it

pub mod channel;
pub mod ffmpeg;
pub mod session;

pub use channel::{FrameExtractor, RecordingError, RecordingResult, VideoRecorder, VideoTarget};
pub use ffmpeg::{FfmpegFrameExtractor, FfmpegRecorder};
pub use session::{RecordingSession, SessionReport};
