//! Pointer gesture classification (click vs. drag)

use crate::action::{Action, ActionKind};
use crate::capture::input::types::{Button, ModifierSet};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingGesture {
    pub x: f64,
    pub y: f64,
    pub press_time: f64,
    pub capture_index: u64,
    pub modifiers: ModifierSet,
}

impl PendingGesture {
    /// Turn the press into an action using the release position
    pub fn finish(self, button: Button, x: f64, y: f64, now: f64) -> Action {
        let moved = (self.x, self.y) != (x, y);
        let kind = match (moved, button) {
            (true, _) => ActionKind::Drag,
            (false, Button::Right) => ActionKind::RightClick,
            (false, _) => ActionKind::LeftClick,
        };

        let mut description = String::new();
        if !self.modifiers.is_empty() {
            description.push_str(&self.modifiers.render());
            description.push('+');
        }
        description.push_str(&format!(
            "{} ({},{}) → ({},{})",
            kind, self.x, self.y, x, y
        ));

        Action::new(
            kind,
            description,
            self.press_time,
            now,
            Some(self.capture_index),
        )
    }
}

#[derive(Debug, Default)]
pub struct GestureTracker {
    pending: HashMap<Button, PendingGesture>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a press. Returns the earlier unmatched press it replaces.
    pub fn press(&mut self, button: Button, gesture: PendingGesture) -> Option<PendingGesture> {
        self.pending.insert(button, gesture)
    }

    pub fn release(&mut self, button: Button) -> Option<PendingGesture> {
        self.pending.remove(&button)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Abandon every in-flight gesture, returning them
    pub fn drain(&mut self) -> Vec<PendingGesture> {
        self.pending.drain().map(|(_, gesture)| gesture).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gesture_at(x: f64, y: f64, modifiers: ModifierSet) -> PendingGesture {
        PendingGesture {
            x,
            y,
            press_time: 1.0,
            capture_index: 1,
            modifiers,
        }
    }

    #[test]
    fn test_click_without_movement() {
        let action = gesture_at(10.0, 10.0, ModifierSet::empty()).finish(Button::Left, 10.0, 10.0, 1.2);
        assert_eq!(action.kind, ActionKind::LeftClick);
        assert_eq!(action.description, "left_click (10,10) → (10,10)");
        assert_eq!(action.start, 1.0);
        assert_eq!(action.end, 1.2);
    }

    #[test]
    fn test_right_click_and_right_drag() {
        let click = gesture_at(5.0, 5.0, ModifierSet::empty()).finish(Button::Right, 5.0, 5.0, 1.0);
        assert_eq!(click.kind, ActionKind::RightClick);

        let drag = gesture_at(5.0, 5.0, ModifierSet::empty()).finish(Button::Right, 6.0, 5.0, 1.0);
        assert_eq!(drag.kind, ActionKind::Drag);
    }

    #[test]
    fn test_press_time_modifiers_prefix_description() {
        let action = gesture_at(1.0, 2.0, ModifierSet::SHIFT | ModifierSet::CTRL)
            .finish(Button::Left, 30.5, 2.0, 2.0);
        assert_eq!(action.description, "ctrl+shift+drag (1,2) → (30.5,2)");
    }

    #[test]
    fn test_second_press_replaces_first() {
        let mut tracker = GestureTracker::new();
        assert!(tracker.press(Button::Left, gesture_at(0.0, 0.0, ModifierSet::empty())).is_none());
        let replaced = tracker.press(Button::Left, gesture_at(9.0, 9.0, ModifierSet::empty()));
        assert_eq!(replaced.map(|g| g.x), Some(0.0));
        assert_eq!(tracker.release(Button::Left).map(|g| g.x), Some(9.0));
        assert!(tracker.release(Button::Left).is_none());
    }

    #[test]
    fn test_drain_hands_back_in_flight_gestures() {
        let mut tracker = GestureTracker::new();
        tracker.press(Button::Left, gesture_at(0.0, 0.0, ModifierSet::empty()));
        tracker.press(Button::Right, gesture_at(4.0, 4.0, ModifierSet::empty()));
        assert_eq!(tracker.pending_count(), 2);

        let drained = tracker.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(tracker.pending_count(), 0);
        assert!(tracker.release(Button::Left).is_none());
    }
}
