//! Input tracking (pointer, keyboard)
//!
//! Platform listeners push raw events through an `InputSender`; one task per
//! source forwards them to the shared action engine.

pub mod channel;
pub mod types;

pub use channel::{InputSender, InputTrackingChannel};
pub use types::{Button, InputEvent, Key, ModifierSet, NamedKey};
