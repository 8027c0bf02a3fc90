//! Action correlation engine
//!
//! Receives raw press/release/move events from the pointer and keyboard
//! sources and decides, without look-ahead, which action each belongs to and
//! when that action is closed. All mutable state (modifier flags, pending
//! gesture/phrase/hold, the action log, the capture queue and the capture
//! index counter) sits behind a single lock, so the two input tasks and the
//! idle watchdog serialize through it.

pub mod gesture;
pub mod modifiers;
pub mod typing;
pub mod watchdog;

use crate::action::{Action, ActionKind, ActionLog};
use crate::capture::input::types::{Button, InputEvent, Key};
use crate::capture::screenshot::{CapturePhase, CaptureQueue, CaptureRequest};
use crate::clock::{Clock, Origin};
use crate::config::EngineConfig;
use gesture::{GestureTracker, PendingGesture};
use modifiers::ModifierTracker;
use parking_lot::Mutex as ParkingMutex;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use typing::TypingAggregator;

pub use watchdog::spawn_watchdog;

/// Everything the engine produced, handed over at shutdown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOutput {
    pub actions: ActionLog,
    pub captures: Vec<CaptureRequest>,
    /// In-flight gestures abandoned at shutdown
    pub dropped_gestures: usize,
}

struct EngineState {
    next_capture_index: u64,
    modifiers: ModifierTracker,
    gestures: GestureTracker,
    typing: TypingAggregator,
    log: ActionLog,
    captures: CaptureQueue,
    stopped: bool,
}

impl EngineState {
    fn next_index(&mut self) -> u64 {
        let index = self.next_capture_index;
        self.next_capture_index += 1;
        index
    }

    /// Close the open typing phrase, if any. Idempotent.
    fn finalize_typing(&mut self) {
        let Some(phrase) = self.typing.take() else {
            return;
        };
        let index = phrase.capture_index;
        let last_token = phrase.last_token;
        if let Some(action) = phrase.into_action() {
            self.log.push(action);
        }
        self.captures.request(index, CapturePhase::End, last_token);
    }

    fn close_hold(&mut self, now: f64) {
        let Some(hold) = self.modifiers.take_hold() else {
            return;
        };
        let index = hold.capture_index;
        match hold.into_action(now) {
            Some(action) => {
                self.log.push(action);
                self.captures.request(index, CapturePhase::End, now);
            }
            None => {
                tracing::trace!("Discarding idle modifier hold #{}", index);
                self.captures.retract(index);
            }
        }
    }

    fn roll_modifier_hold(&mut self, now: f64) {
        if !self.modifiers.needs_rollover() {
            return;
        }
        self.close_hold(now);

        let current = self.modifiers.current();
        if !current.is_empty() {
            let index = self.next_index();
            self.modifiers.begin_hold(current, now, index);
            self.captures.request(index, CapturePhase::Start, now);
        }
    }

    fn modifier_key_change(&mut self, key: &Key, is_down: bool, now: f64) -> bool {
        if !self.modifiers.set_key(key, is_down) {
            return false;
        }
        self.roll_modifier_hold(now);
        true
    }

    fn key_press(&mut self, key: &Key, now: f64) {
        if self.modifier_key_change(key, true, now) {
            return;
        }

        self.modifiers.mark_used();

        let held = self.modifiers.current();
        if held.is_combo_context() {
            self.finalize_typing();
            let index = self.next_index();
            self.captures.request(index, CapturePhase::Start, now);
            let description = format!("{}+{}", held.render(), key);
            self.log.push(Action::new(
                ActionKind::KeyCombo,
                description,
                now,
                now,
                Some(index),
            ));
            self.captures.request(index, CapturePhase::End, now);
            return;
        }

        let Some(token) = key.typing_token() else {
            tracing::trace!("Ignoring key {}", key);
            return;
        };

        // The watchdog may not have ticked yet
        if self.typing.is_stale(now) {
            self.finalize_typing();
        }

        if let Err(token) = self.typing.push(token, now) {
            let index = self.next_index();
            self.typing.open(token, now, index);
            self.captures.request(index, CapturePhase::Start, now);
        }
    }

    fn button(&mut self, button: Button, x: f64, y: f64, is_down: bool, now: f64) -> Option<Action> {
        if !button.is_tracked() {
            tracing::trace!("Ignoring untracked button {:?}", button);
            return None;
        }

        if is_down {
            let index = self.next_index();
            self.captures.request(index, CapturePhase::Start, now);
            let gesture = PendingGesture {
                x,
                y,
                press_time: now,
                capture_index: index,
                modifiers: self.modifiers.current(),
            };
            if let Some(abandoned) = self.gestures.press(button, gesture) {
                tracing::debug!(
                    "{:?} pressed again before release, abandoning press #{}",
                    button,
                    abandoned.capture_index
                );
                self.captures.retract(abandoned.capture_index);
            }
            return None;
        }

        let Some(pending) = self.gestures.release(button) else {
            tracing::trace!("Unmatched {:?} release at ({},{})", button, x, y);
            return None;
        };

        self.finalize_typing();
        let index = pending.capture_index;
        let action = pending.finish(button, x, y, now);
        self.captures.request(index, CapturePhase::End, now);
        self.log.push(action.clone());
        Some(action)
    }
}

/// Shared aggregator for one recording session
///
/// Construct once per session and share it behind an `Arc` with whatever
/// feeds it events.
pub struct ActionEngine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    origin: Origin,
    shutdown: CancellationToken,
    state: ParkingMutex<EngineState>,
}

impl ActionEngine {
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let origin = Origin::capture(clock.as_ref());
        let state = EngineState {
            next_capture_index: 1,
            modifiers: ModifierTracker::new(),
            gestures: GestureTracker::new(),
            typing: TypingAggregator::new(config.typing_gap.as_secs_f64()),
            log: ActionLog::new(),
            captures: CaptureQueue::new(config.capture_enabled),
            stopped: false,
        };

        tracing::info!(
            "Action engine started (typing_gap={:?}, captures={})",
            config.typing_gap,
            config.capture_enabled
        );

        Self {
            config,
            clock,
            origin,
            shutdown: CancellationToken::new(),
            state: ParkingMutex::new(state),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Cancelled when the engine stops
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().stopped
    }

    fn now(&self) -> f64 {
        self.origin.offset(self.clock.now())
    }

    /// Run `f` against the live state, or skip it once stopped
    fn with_state<R>(&self, f: impl FnOnce(&mut EngineState, f64) -> R) -> Option<R> {
        let mut state = self.state.lock();
        if state.stopped {
            tracing::trace!("Event after engine stop ignored");
            return None;
        }
        let now = self.now();
        Some(f(&mut state, now))
    }

    /// Returns whether `key` is a modifier. Modifier changes roll the active
    /// modifier hold over.
    pub fn on_modifier_key_change(&self, key: &Key, is_down: bool) -> bool {
        self.with_state(|state, now| state.modifier_key_change(key, is_down, now))
            .unwrap_or_else(|| key.modifier().is_some())
    }

    pub fn on_key_press(&self, key: &Key) {
        self.with_state(|state, now| state.key_press(key, now));
    }

    /// Only modifier releases matter; others are unmatched and ignored
    pub fn on_key_release(&self, key: &Key) {
        self.on_modifier_key_change(key, false);
    }

    /// Returns the finalized click/drag on a matching release
    pub fn on_button(&self, button: Button, x: f64, y: f64, is_down: bool) -> Option<Action> {
        self.with_state(|state, now| state.button(button, x, y, is_down, now))
            .flatten()
    }

    pub fn handle(&self, event: &InputEvent) {
        match event {
            InputEvent::Button {
                button,
                x,
                y,
                pressed,
            } => {
                self.on_button(*button, *x, *y, *pressed);
            }
            InputEvent::Key { key, pressed: true } => self.on_key_press(key),
            InputEvent::Key {
                key,
                pressed: false,
            } => self.on_key_release(key),
            InputEvent::Move { .. } => {}
        }
    }

    pub fn finalize_typing(&self) {
        self.with_state(|state, _| state.finalize_typing());
    }

    /// Close the open phrase once it has been idle past the typing gap.
    /// Returns true if a phrase was closed.
    pub fn check_idle(&self) -> bool {
        self.with_state(|state, now| {
            if state.typing.is_stale(now) {
                state.finalize_typing();
                true
            } else {
                false
            }
        })
        .unwrap_or(false)
    }

    /// Snapshot of the actions finalized so far
    pub fn actions(&self) -> Vec<Action> {
        self.state.lock().log.as_slice().to_vec()
    }

    pub fn capture_requests(&self) -> Vec<CaptureRequest> {
        self.state.lock().captures.requests().to_vec()
    }

    /// Stop the watchdog, flush the open phrase and modifier hold, and hand
    /// over everything produced. Pending gestures are dropped along with their
    /// capture requests. A second call returns an empty output.
    pub fn stop(&self) -> EngineOutput {
        self.shutdown.cancel();

        let mut state = self.state.lock();
        if state.stopped {
            return EngineOutput::default();
        }
        let now = self.now();

        state.finalize_typing();
        state.close_hold(now);
        let dropped = state.gestures.drain();
        for gesture in &dropped {
            state.captures.retract(gesture.capture_index);
        }
        let dropped_gestures = dropped.len();
        if dropped_gestures > 0 {
            tracing::warn!(
                "Dropping {} in-flight gesture(s) at shutdown",
                dropped_gestures
            );
        }
        state.stopped = true;

        let actions = std::mem::take(&mut state.log);
        let captures = state.captures.take();

        tracing::info!(
            "Action engine stopped (actions={}, captures={})",
            actions.len(),
            captures.len()
        );

        EngineOutput {
            actions,
            captures,
            dropped_gestures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::input::types::NamedKey;
    use crate::clock::ManualClock;
    use std::time::Duration;

    const GAP: f64 = 5.0;

    fn engine_with(capture_enabled: bool) -> (Arc<ManualClock>, ActionEngine) {
        let clock = Arc::new(ManualClock::new());
        let config = EngineConfig {
            typing_gap: Duration::from_secs_f64(GAP),
            watchdog_interval: Duration::from_millis(500),
            capture_enabled,
        };
        let engine = ActionEngine::new(config, clock.clone());
        (clock, engine)
    }

    fn engine() -> (Arc<ManualClock>, ActionEngine) {
        engine_with(false)
    }

    fn type_str(engine: &ActionEngine, text: &str) {
        for c in text.chars() {
            engine.on_key_press(&Key::Char(c));
            engine.on_key_release(&Key::Char(c));
        }
    }

    const COMMAND: Key = Key::Named(NamedKey::Command);
    const SHIFT: Key = Key::Named(NamedKey::Shift);
    const CTRL: Key = Key::Named(NamedKey::Ctrl);

    #[test]
    fn test_left_click_scenario() {
        let (_clock, engine) = engine();
        assert!(engine.on_button(Button::Left, 10.0, 10.0, true).is_none());
        let action = engine.on_button(Button::Left, 10.0, 10.0, false).unwrap();

        assert_eq!(action.kind, ActionKind::LeftClick);
        assert_eq!(action.start, action.end);
        assert!(action.description.contains("(10,10) → (10,10)"));
        assert_eq!(engine.actions().len(), 1);
    }

    #[test]
    fn test_drag_scenario() {
        let (clock, engine) = engine();
        engine.on_button(Button::Left, 10.0, 10.0, true);
        clock.advance_secs(0.4);
        let action = engine.on_button(Button::Left, 50.0, 50.0, false).unwrap();

        assert_eq!(action.kind, ActionKind::Drag);
        assert!(action.description.contains("(10,10) → (50,50)"));
        assert!((action.end - action.start - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_unmatched_release_is_ignored() {
        let (_clock, engine) = engine();
        assert!(engine.on_button(Button::Left, 1.0, 1.0, false).is_none());
        engine.on_button(Button::Middle, 1.0, 1.0, true);
        assert!(engine.on_button(Button::Middle, 1.0, 1.0, false).is_none());
        engine.on_button(Button::Right, 1.0, 1.0, true);
        assert!(engine.on_button(Button::Left, 1.0, 1.0, false).is_none());
        assert!(engine.actions().is_empty());
    }

    #[test]
    fn test_release_matches_most_recent_press() {
        let (_clock, engine) = engine();
        engine.on_button(Button::Left, 0.0, 0.0, true);
        engine.on_button(Button::Left, 20.0, 20.0, true);
        let action = engine.on_button(Button::Left, 20.0, 20.0, false).unwrap();
        assert_eq!(action.kind, ActionKind::LeftClick);
        assert_eq!(action.capture_index, Some(2));
        assert!(engine.on_button(Button::Left, 20.0, 20.0, false).is_none());
    }

    #[test]
    fn test_click_carries_press_time_modifiers() {
        let (_clock, engine) = engine();
        engine.on_key_press(&CTRL);
        engine.on_button(Button::Left, 3.0, 4.0, true);
        engine.on_key_release(&CTRL);
        let action = engine.on_button(Button::Left, 3.0, 4.0, false).unwrap();
        assert_eq!(action.description, "ctrl+left_click (3,4) → (3,4)");
    }

    #[test]
    fn test_command_combo_scenario() {
        let (clock, engine) = engine();
        engine.on_key_press(&COMMAND);
        clock.advance_secs(0.2);
        engine.on_key_press(&Key::Char('c'));
        engine.on_key_release(&Key::Char('c'));
        clock.advance_secs(0.2);
        engine.on_key_release(&COMMAND);

        let actions = engine.actions();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].kind, ActionKind::KeyCombo);
        assert_eq!(actions[0].description, "command+c");
        assert_eq!(actions[1].kind, ActionKind::ModifierHold);
        assert_eq!(actions[1].description, "command held");
        assert!((actions[1].end - actions[1].start - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_combo_renders_modifiers_canonically() {
        let (_clock, engine) = engine();
        engine.on_key_press(&SHIFT);
        engine.on_key_press(&COMMAND);
        engine.on_key_press(&Key::Char('z'));
        let actions = engine.actions();
        assert_eq!(actions.last().unwrap().description, "command+shift+z");
    }

    #[test]
    fn test_combo_with_named_key() {
        let (_clock, engine) = engine();
        engine.on_key_press(&Key::Named(NamedKey::Alt));
        engine.on_key_press(&Key::Named(NamedKey::Tab));
        assert_eq!(engine.actions()[0].description, "option+tab");
    }

    #[test]
    fn test_idle_shift_hold_yields_nothing() {
        let (clock, engine) = engine();
        engine.on_key_press(&SHIFT);
        clock.advance_secs(1.0);
        engine.on_key_release(&SHIFT);
        assert!(engine.actions().is_empty());
        assert!(engine.stop().actions.is_empty());
    }

    #[test]
    fn test_shift_typing_is_not_a_combo() {
        let (_clock, engine) = engine();
        engine.on_key_press(&SHIFT);
        engine.on_key_press(&Key::Char('H'));
        engine.on_key_release(&SHIFT);
        type_str(&engine, "i");

        let output = engine.stop();
        let descriptions: Vec<_> = output.actions.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(descriptions, vec!["shift held", "typed: 'Hi'"]);
    }

    #[test]
    fn test_changing_modifier_set_rolls_hold_over() {
        let (_clock, engine) = engine();
        engine.on_key_press(&CTRL);
        engine.on_key_press(&Key::Char('a'));
        engine.on_key_press(&SHIFT);
        engine.on_key_press(&Key::Char('b'));
        engine.on_key_release(&SHIFT);
        engine.on_key_release(&CTRL);

        // Releasing shift reopens a ctrl-only hold that is never used
        let kinds: Vec<_> = engine
            .actions()
            .into_iter()
            .map(|a| (a.kind, a.description))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ActionKind::KeyCombo, "ctrl+a".to_string()),
                (ActionKind::ModifierHold, "ctrl held".to_string()),
                (ActionKind::KeyCombo, "ctrl+shift+b".to_string()),
                (ActionKind::ModifierHold, "ctrl+shift held".to_string()),
            ]
        );
    }

    #[test]
    fn test_modifier_key_change_reports_consumption() {
        let (_clock, engine) = engine();
        assert!(engine.on_modifier_key_change(&COMMAND, true));
        assert!(!engine.on_modifier_key_change(&Key::Char('x'), true));
        assert!(engine.actions().is_empty());
    }

    #[test]
    fn test_typed_phrase_concatenates_tokens() {
        let (clock, engine) = engine();
        type_str(&engine, "hi");
        engine.on_key_press(&Key::Named(NamedKey::Space));
        engine.on_key_press(&Key::Named(NamedKey::Backspace));
        engine.on_key_press(&Key::Named(NamedKey::Escape));
        clock.advance_secs(1.0);
        engine.on_key_press(&Key::Named(NamedKey::Enter));

        let output = engine.stop();
        assert_eq!(output.actions.len(), 1);
        let action = &output.actions.as_slice()[0];
        assert_eq!(action.description, "typed: 'hi <BACKSPACE>\n'");
        assert_eq!(action.start, 0.0);
        assert!((action.end - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_splits_phrases() {
        let (clock, engine) = engine();
        type_str(&engine, "ab");
        clock.advance_secs(GAP + 1.0);
        type_str(&engine, "c");

        let output = engine.stop();
        let descriptions: Vec<_> = output.actions.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(descriptions, vec!["typed: 'ab'", "typed: 'c'"]);
    }

    #[test]
    fn test_keys_within_gap_stay_in_one_phrase() {
        let (clock, engine) = engine();
        type_str(&engine, "a");
        clock.advance_secs(GAP - 0.5);
        assert!(!engine.check_idle());
        type_str(&engine, "b");
        clock.advance_secs(GAP - 0.5);
        type_str(&engine, "c");

        let output = engine.stop();
        assert_eq!(output.actions.len(), 1);
        assert_eq!(output.actions.as_slice()[0].description, "typed: 'abc'");
    }

    #[test]
    fn test_check_idle_closes_stale_phrase() {
        let (clock, engine) = engine();
        type_str(&engine, "ok");
        clock.advance_secs(GAP + 0.1);
        assert!(engine.check_idle());
        assert!(!engine.check_idle());
        assert_eq!(engine.actions()[0].description, "typed: 'ok'");
    }

    #[test]
    fn test_finalize_typing_is_idempotent() {
        let (_clock, engine) = engine();
        type_str(&engine, "x");
        engine.finalize_typing();
        engine.finalize_typing();
        assert_eq!(engine.actions().len(), 1);
    }

    #[test]
    fn test_combo_closes_typing_first() {
        let (_clock, engine) = engine();
        type_str(&engine, "abc");
        engine.on_key_press(&COMMAND);
        engine.on_key_press(&Key::Char('s'));

        let kinds: Vec<_> = engine.actions().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::Typing, ActionKind::KeyCombo]);
    }

    #[test]
    fn test_click_release_closes_typing_first() {
        let (_clock, engine) = engine();
        engine.on_button(Button::Left, 0.0, 0.0, true);
        type_str(&engine, "abc");
        engine.on_button(Button::Left, 0.0, 0.0, false);

        let actions = engine.actions();
        assert_eq!(actions[0].kind, ActionKind::Typing);
        assert_eq!(actions[1].kind, ActionKind::LeftClick);
        assert!(actions[0].capture_index > actions[1].capture_index);
    }

    #[test]
    fn test_stop_flushes_and_drops_pending_gesture() {
        let (_clock, engine) = engine();
        engine.on_key_press(&COMMAND);
        engine.on_key_press(&Key::Char('v'));
        engine.on_button(Button::Left, 5.0, 5.0, true);
        type_str(&engine, "q");

        let output = engine.stop();
        assert_eq!(output.dropped_gestures, 1);
        let kinds: Vec<_> = output.actions.iter().map(|a| a.kind).collect();
        // 'q' pressed while command is held is a combo, not typing
        assert_eq!(
            kinds,
            vec![ActionKind::KeyCombo, ActionKind::KeyCombo, ActionKind::ModifierHold]
        );
        assert!(engine.is_stopped());
        assert!(engine.shutdown_token().is_cancelled());
    }

    #[test]
    fn test_events_after_stop_are_ignored() {
        let (_clock, engine) = engine();
        engine.stop();
        engine.on_button(Button::Left, 0.0, 0.0, true);
        assert!(engine.on_button(Button::Left, 0.0, 0.0, false).is_none());
        type_str(&engine, "late");
        assert!(engine.actions().is_empty());
        assert_eq!(engine.stop(), EngineOutput::default());
    }

    #[test]
    fn test_capture_indices_are_shared_and_unique() {
        let (_clock, engine) = engine_with(true);
        engine.on_key_press(&CTRL);
        engine.on_button(Button::Left, 1.0, 1.0, true);
        type_str(&engine, "x");
        engine.on_key_release(&CTRL);
        engine.on_button(Button::Left, 2.0, 2.0, false);
        type_str(&engine, "y");

        let output = engine.stop();
        let mut indices: Vec<_> = output.actions.iter().filter_map(|a| a.capture_index).collect();
        let total = indices.len();
        indices.sort_unstable();
        indices.dedup();
        assert_eq!(indices.len(), total);

        for action in output.actions.iter() {
            let index = action.capture_index.unwrap();
            let phases: Vec<_> = output
                .captures
                .iter()
                .filter(|c| c.index == index)
                .map(|c| c.phase)
                .collect();
            assert_eq!(phases, vec![CapturePhase::Start, CapturePhase::End]);
        }
    }

    #[test]
    fn test_idle_hold_retracts_its_capture() {
        let (_clock, engine) = engine_with(true);
        engine.on_key_press(&SHIFT);
        engine.on_key_release(&SHIFT);
        assert!(engine.capture_requests().is_empty());
    }

    #[test]
    fn test_abandoned_and_dropped_gestures_retract_their_captures() {
        let (_clock, engine) = engine_with(true);
        engine.on_button(Button::Left, 0.0, 0.0, true);
        engine.on_button(Button::Left, 1.0, 1.0, true);
        engine.on_button(Button::Left, 1.0, 1.0, false);
        engine.on_button(Button::Right, 5.0, 5.0, true);

        let output = engine.stop();
        assert_eq!(output.dropped_gestures, 1);
        let indices: Vec<_> = output.actions.iter().filter_map(|a| a.capture_index).collect();
        assert_eq!(indices, vec![2]);
        assert!(!output.captures.is_empty());
        assert!(output
            .captures
            .iter()
            .all(|c| indices.contains(&c.index)));
    }

    #[test]
    fn test_typing_end_capture_uses_last_token_time() {
        let (clock, engine) = engine_with(true);
        type_str(&engine, "a");
        clock.advance_secs(1.0);
        type_str(&engine, "b");
        clock.advance_secs(GAP + 1.0);
        engine.check_idle();

        let captures = engine.capture_requests();
        assert_eq!(captures.len(), 2);
        assert_eq!(captures[1].phase, CapturePhase::End);
        assert!((captures[1].offset_secs - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_handle_dispatches_events() {
        let (_clock, engine) = engine();
        let events = [
            InputEvent::Key { key: COMMAND, pressed: true },
            InputEvent::Key { key: Key::Char('a'), pressed: true },
            InputEvent::Key { key: COMMAND, pressed: false },
            InputEvent::Move { x: 1.0, y: 1.0 },
            InputEvent::Button { button: Button::Right, x: 4.0, y: 4.0, pressed: true },
            InputEvent::Button { button: Button::Right, x: 4.0, y: 4.0, pressed: false },
        ];
        for event in &events {
            engine.handle(event);
        }
        let kinds: Vec<_> = engine.actions().iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![ActionKind::KeyCombo, ActionKind::ModifierHold, ActionKind::RightClick]
        );
    }
}
