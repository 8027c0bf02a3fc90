//! Input capture and still-frame bookkeeping
//!
//! Raw pointer/key events enter through `input`; `screenshot` queues the
//! frames to extract once the video is finalized.

pub mod input;
pub mod screenshot;

pub use input::{InputSender, InputTrackingChannel};
pub use screenshot::{CapturePhase, CaptureQueue, CaptureRequest};
