//! Pending command and control tokens
//!
//! Commands (`start_preload`, `start_playback`) and controls
//! (`trigger_overlay`, possibly with a suffix) arrive asynchronously from the
//! experiment side. States consume the tokens they act on; everything else
//! stays queued for a later tick.

use std::collections::VecDeque;

pub const START_PRELOAD: &str = "start_preload";
pub const START_PLAYBACK: &str = "start_playback";
pub const TRIGGER_OVERLAY: &str = "trigger_overlay";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandQueue {
    tokens: VecDeque<String>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push_back(token.into());
    }

    /// Remove the first token equal to `token`; true if one was found
    pub fn take(&mut self, token: &str) -> bool {
        match self.tokens.iter().position(|t| t == token) {
            Some(pos) => {
                self.tokens.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove every token containing `pattern`, returns how many
    pub fn take_matching(&mut self, pattern: &str) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|t| !t.contains(pattern));
        before - self.tokens.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn clear(&mut self) {
        self.tokens.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}
