//! Bounded prompt history for interactive sessions.
//!
//! The system preamble is always kept; of the remaining turns only the most
//! recent `window` survive, so later goals can refer to earlier patches
//! without the conversation growing without bound.

use patchcraft_core::{ChatMessage, Role};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PromptHistory {
    system: ChatMessage,
    turns: Vec<ChatMessage>,
    #[serde(skip)]
    window: usize,
}

impl PromptHistory {
    pub fn new(system_prompt: impl Into<String>, window: usize) -> Self {
        Self {
            system: ChatMessage::system(system_prompt),
            turns: Vec::new(),
            window,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::assistant(content));
        self.trim();
    }

    /// Remove a trailing user turn that never got an answer
    pub fn abandon_user(&mut self) {
        if self.turns.last().map(|m| m.role) == Some(Role::User) {
            self.turns.pop();
        }
    }

    /// The conversation to send: system preamble first, then the kept turns
    pub fn messages(&self) -> Vec<ChatMessage> {
        std::iter::once(self.system.clone())
            .chain(self.turns.iter().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        1 + self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    fn trim(&mut self) {
        if self.turns.len() > self.window {
            let excess = self.turns.len() - self.window;
            self.turns.drain(..excess);
        }
    }
}
