//! Modifier state tracking and modifier holds

use crate::action::{Action, ActionKind};
use crate::capture::input::types::{Key, ModifierSet, NamedKey};
use std::collections::HashSet;

/// A non-empty modifier set held without change
#[derive(Debug, Clone, PartialEq)]
pub struct PendingHold {
    pub modifiers: ModifierSet,
    pub start: f64,
    pub capture_index: u64,
    /// Set by the first non-modifier key press during the hold
    pub used: bool,
}

impl PendingHold {
    /// Idle holds yield no action
    pub fn into_action(self, end: f64) -> Option<Action> {
        if !self.used {
            return None;
        }
        Some(Action::new(
            ActionKind::ModifierHold,
            format!("{} held", self.modifiers.render()),
            self.start,
            end,
            Some(self.capture_index),
        ))
    }
}

#[derive(Debug, Default)]
pub struct ModifierTracker {
    /// Physical modifier keys currently down (left and right tracked apart)
    down: HashSet<NamedKey>,
    hold: Option<PendingHold>,
}

impl ModifierTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update down/up state. Returns false when `key` is not a modifier.
    pub fn set_key(&mut self, key: &Key, is_down: bool) -> bool {
        let Key::Named(named) = key else {
            return false;
        };
        if named.modifier().is_none() {
            return false;
        }
        if is_down {
            self.down.insert(*named);
        } else {
            self.down.remove(named);
        }
        true
    }

    pub fn current(&self) -> ModifierSet {
        self.down
            .iter()
            .filter_map(|key| key.modifier())
            .fold(ModifierSet::empty(), |acc, m| acc | m)
    }

    /// Whether the active hold (if any) no longer matches the held set
    pub fn needs_rollover(&self) -> bool {
        let current = self.current();
        match &self.hold {
            None => !current.is_empty(),
            Some(hold) => hold.modifiers != current,
        }
    }

    pub fn mark_used(&mut self) {
        if let Some(hold) = self.hold.as_mut() {
            hold.used = true;
        }
    }

    pub fn take_hold(&mut self) -> Option<PendingHold> {
        self.hold.take()
    }

    pub fn begin_hold(&mut self, modifiers: ModifierSet, start: f64, capture_index: u64) {
        self.hold = Some(PendingHold {
            modifiers,
            start,
            capture_index,
            used: false,
        });
    }
}
