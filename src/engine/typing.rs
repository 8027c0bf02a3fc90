//! Typing phrase aggregation
//!
//! Consecutive character-producing key presses collapse into one phrase.
//! Only one phrase is open at a time.

use crate::action::{Action, ActionKind};

#[derive(Debug, Clone, PartialEq)]
pub struct PendingPhrase {
    pub tokens: Vec<String>,
    pub start: f64,
    pub last_token: f64,
    pub capture_index: u64,
}

impl PendingPhrase {
    pub fn text(&self) -> String {
        self.tokens.concat()
    }

    /// `None` for an empty phrase
    pub fn into_action(self) -> Option<Action> {
        let text = self.text();
        if text.is_empty() {
            return None;
        }
        Some(Action::new(
            ActionKind::Typing,
            format!("typed: '{}'", text),
            self.start,
            self.last_token,
            Some(self.capture_index),
        ))
    }
}

#[derive(Debug)]
pub struct TypingAggregator {
    gap_secs: f64,
    phrase: Option<PendingPhrase>,
}

impl TypingAggregator {
    pub fn new(gap_secs: f64) -> Self {
        Self {
            gap_secs,
            phrase: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.phrase.is_some()
    }

    pub fn phrase(&self) -> Option<&PendingPhrase> {
        self.phrase.as_ref()
    }

    /// True once the open phrase has seen no token for longer than the gap
    pub fn is_stale(&self, now: f64) -> bool {
        self.phrase
            .as_ref()
            .is_some_and(|phrase| now - phrase.last_token > self.gap_secs)
    }

    /// Append a token to the open phrase. Hands the token back when no
    /// phrase is open.
    pub fn push(&mut self, token: String, now: f64) -> Result<(), String> {
        let Some(phrase) = self.phrase.as_mut() else {
            return Err(token);
        };
        phrase.tokens.push(token);
        phrase.last_token = now;
        Ok(())
    }

    /// Start a new phrase, replacing any open one
    pub fn open(&mut self, token: String, now: f64, capture_index: u64) {
        self.phrase = Some(PendingPhrase {
            tokens: vec![token],
            start: now,
            last_token: now,
            capture_index,
        });
    }

    pub fn take(&mut self) -> Option<PendingPhrase> {
        self.phrase.take()
    }
}
