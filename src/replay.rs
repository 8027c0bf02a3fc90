//! Scripted input replay
//!
//! Drives an engine from a recorded event script instead of live listeners.
//! Each line of a script is one JSON object:
//!
//! ```json
//! {"at": 1.25, "event": {"type": "key", "key": {"char": "a"}, "pressed": true}}
//! ```
//!
//! `at` is seconds since the start of the script and must not decrease.

use crate::clock::ManualClock;
use crate::config::EngineConfig;
use crate::capture::input::types::InputEvent;
use crate::engine::{ActionEngine, EngineOutput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedEvent {
    pub at: f64,
    pub event: InputEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: time {at} is before the previous event")]
    OutOfOrder { line: usize, at: f64 },

    #[error("line {line}: invalid time {at}")]
    InvalidTime { line: usize, at: f64 },
}

/// Parse a JSON-lines script. Blank lines and `#` comments are skipped.
pub fn parse_script(input: &str) -> Result<Vec<ScriptedEvent>, ScriptError> {
    let mut events = Vec::new();
    let mut last = 0.0;

    for (i, raw) in input.lines().enumerate() {
        let line = i + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let event: ScriptedEvent = serde_json::from_str(trimmed)
            .map_err(|source| ScriptError::Parse { line, source })?;
        if !event.at.is_finite() || event.at < 0.0 {
            return Err(ScriptError::InvalidTime { line, at: event.at });
        }
        if event.at < last {
            return Err(ScriptError::OutOfOrder { line, at: event.at });
        }
        last = event.at;
        events.push(event);
    }

    Ok(events)
}

/// Feed `events` through a fresh engine on a manual clock and stop it after
/// the last one. The idle check runs before every event, standing in for the
/// watchdog.
pub fn replay_script(events: &[ScriptedEvent], config: EngineConfig) -> EngineOutput {
    let clock = Arc::new(ManualClock::new());
    let engine = ActionEngine::new(config, clock.clone());
    let mut elapsed = 0.0;

    for scripted in events {
        if scripted.at > elapsed {
            clock.advance_secs(scripted.at - elapsed);
            elapsed = scripted.at;
        }
        engine.check_idle();
        engine.handle(&scripted.event);
    }

    let output = engine.stop();
    tracing::debug!(
        "Replayed {} events into {} actions",
        events.len(),
        output.actions.len()
    );
    output
}
