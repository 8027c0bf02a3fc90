//! Post-recording processing
//!
//! Transformations applied to the engine's output once the video exists.

pub mod alignment;

pub use alignment::{align_output, FrameGrid};
