//! Finalized actions and the append-only action log

use crate::recorder::channel::RecordingResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    LeftClick,
    RightClick,
    Drag,
    KeyCombo,
    Typing,
    ModifierHold,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::LeftClick => "left_click",
            ActionKind::RightClick => "right_click",
            ActionKind::Drag => "drag",
            ActionKind::KeyCombo => "key_combo",
            ActionKind::Typing => "typing",
            ActionKind::ModifierHold => "modifier_hold",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One semantically meaningful user action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub description: String,
    /// Seconds since the origin (or the video's first frame, once aligned)
    pub start: f64,
    pub end: f64,
    pub capture_index: Option<u64>,
}

impl Action {
    pub fn new(
        kind: ActionKind,
        description: impl Into<String>,
        start: f64,
        end: f64,
        capture_index: Option<u64>,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            start,
            end: end.max(start),
            capture_index,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Ordered record of finalized actions
///
/// Actions are appended in the order their closing event occurs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionLog {
    actions: Vec<Action>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        tracing::debug!(
            "Action #{:?} {} [{:.3}s – {:.3}s] {}",
            action.capture_index,
            action.kind,
            action.start,
            action.end,
            action.description
        );
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.actions.iter_mut()
    }

    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    /// Restore creation order. Actions without a capture index keep their
    /// relative order and sort last.
    pub fn sort_by_capture_index(&mut self) {
        self.actions
            .sort_by_key(|action| action.capture_index.unwrap_or(u64::MAX));
    }

    /// One `kind start – end | description` row per action
    pub fn summary(&self) -> String {
        self.actions
            .iter()
            .map(|action| {
                format!(
                    "{:<15} {:8.2}s – {:8.2}s | {}\n",
                    action.kind.as_str(),
                    action.start,
                    action.end,
                    action.description
                )
            })
            .collect()
    }

    pub fn write_json(&self, path: &Path) -> RecordingResult<()> {
        let data = serde_json::to_vec_pretty(&self.actions)?;
        std::fs::write(path, data)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> RecordingResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let actions: Vec<Action> = serde_json::from_str(&content)?;
        Ok(Self { actions })
    }
}

impl From<Vec<Action>> for ActionLog {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}
