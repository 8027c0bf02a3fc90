use crate::capture::input::types::InputEvent;
use crate::engine::ActionEngine;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handle given to platform listeners for delivering raw events
///
/// Pointer and key events travel on separate channels, one per source.
#[derive(Debug, Clone)]
pub struct InputSender {
    pointer: UnboundedSender<InputEvent>,
    keyboard: UnboundedSender<InputEvent>,
}

impl InputSender {
    /// Route an event to its source's channel. Returns false once the
    /// channel has shut down.
    pub fn send(&self, event: InputEvent) -> bool {
        let channel = if event.is_pointer() {
            &self.pointer
        } else {
            &self.keyboard
        };
        channel.send(event).is_ok()
    }
}

/// Per-source tasks feeding the shared engine
pub struct InputTrackingChannel {
    cancel: CancellationToken,
    pointer_task: JoinHandle<usize>,
    keyboard_task: JoinHandle<usize>,
}

impl InputTrackingChannel {
    /// Spawn one task per input source on the current runtime
    pub fn start(engine: Arc<ActionEngine>) -> (Self, InputSender) {
        let cancel = CancellationToken::new();
        let (pointer_tx, pointer_rx) = mpsc::unbounded_channel();
        let (keyboard_tx, keyboard_rx) = mpsc::unbounded_channel();

        let pointer_task = tokio::spawn(source_loop(
            "pointer",
            engine.clone(),
            pointer_rx,
            cancel.clone(),
        ));
        let keyboard_task = tokio::spawn(source_loop(
            "keyboard",
            engine,
            keyboard_rx,
            cancel.clone(),
        ));

        tracing::info!("Input tracking started");

        let sender = InputSender {
            pointer: pointer_tx,
            keyboard: keyboard_tx,
        };
        (
            Self {
                cancel,
                pointer_task,
                keyboard_task,
            },
            sender,
        )
    }

    /// Stop both source tasks after draining what is already queued.
    /// Returns the number of events dispatched.
    pub async fn stop(self) -> usize {
        self.cancel.cancel();

        let mut dispatched = 0;
        for (name, task) in [("pointer", self.pointer_task), ("keyboard", self.keyboard_task)] {
            match task.await {
                Ok(count) => dispatched += count,
                Err(e) => tracing::warn!("{} input task failed: {}", name, e),
            }
        }

        tracing::info!("Input tracking stopped (events={})", dispatched);
        dispatched
    }
}

async fn source_loop(
    name: &'static str,
    engine: Arc<ActionEngine>,
    mut rx: UnboundedReceiver<InputEvent>,
    cancel: CancellationToken,
) -> usize {
    let mut dispatched = 0;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => {
                    engine.handle(&event);
                    dispatched += 1;
                }
                None => {
                    tracing::debug!("{} source closed", name);
                    return dispatched;
                }
            },
            _ = cancel.cancelled() => break,
        }
    }

    while let Ok(event) = rx.try_recv() {
        engine.handle(&event);
        dispatched += 1;
    }
    dispatched
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::capture::input::types::{Button, Key, NamedKey};
    use crate::clock::SystemClock;
    use crate::config::EngineConfig;

    #[tokio::test]
    async fn test_events_from_both_sources_reach_engine() {
        let engine = Arc::new(ActionEngine::new(EngineConfig::default(), Arc::new(SystemClock)));
        let (channel, sender) = InputTrackingChannel::start(engine.clone());

        let events = [
            InputEvent::Key { key: Key::Named(NamedKey::Command), pressed: true },
            InputEvent::Key { key: Key::Char('c'), pressed: true },
            InputEvent::Key { key: Key::Named(NamedKey::Command), pressed: false },
            InputEvent::Button { button: Button::Left, x: 10.0, y: 10.0, pressed: true },
            InputEvent::Move { x: 30.0, y: 30.0 },
            InputEvent::Button { button: Button::Left, x: 50.0, y: 50.0, pressed: false },
        ];
        for event in events {
            assert!(sender.send(event));
        }

        assert_eq!(channel.stop().await, 6);

        let mut kinds: Vec<_> = engine.actions().iter().map(|a| a.kind).collect();
        kinds.sort_by_key(|kind| kind.as_str());
        assert_eq!(
            kinds,
            vec![ActionKind::Drag, ActionKind::KeyCombo, ActionKind::ModifierHold]
        );
    }

    #[tokio::test]
    async fn test_send_after_stop_fails() {
        let engine = Arc::new(ActionEngine::new(EngineConfig::default(), Arc::new(SystemClock)));
        let (channel, sender) = InputTrackingChannel::start(engine);
        channel.stop().await;
        assert!(!sender.send(InputEvent::Move { x: 0.0, y: 0.0 }));
    }
}
