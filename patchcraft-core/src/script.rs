//! # Generated script
//!
//! A completion split into command lines. Lines are yielded lazily and in
//! their original order; blank lines are skipped. No command syntax is
//! checked here, the patching environment is the only judge of that.

use crate::config::TruncationPolicy;
use std::str::Lines;
use tracing::warn;

/// Iterator over the non-blank lines of a completion
#[derive(Debug, Clone)]
pub struct Commands<'a> {
    lines: Lines<'a>,
}

impl<'a> Iterator for Commands<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        self.lines.by_ref().find(|line| !line.trim().is_empty())
    }
}

/// Split `text` on line boundaries, discarding blank lines.
///
/// `\r\n` endings are handled; the commands themselves are not trimmed.
pub fn split_commands(text: &str) -> Commands<'_> {
    Commands { lines: text.lines() }
}

/// The ordered commands of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    text: String,
    dropped_tail: Option<String>,
}

impl Script {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            dropped_tail: None,
        }
    }

    /// Build a script from a completion body, applying `policy` when the
    /// model stopped on its token budget.
    ///
    /// A body counts as truncated only if `hit_token_limit` is set and it
    /// does not end in a newline; the last line is then incomplete.
    pub fn from_completion(
        body: impl Into<String>,
        hit_token_limit: bool,
        policy: TruncationPolicy,
    ) -> Self {
        let mut text = body.into();
        if !hit_token_limit || text.ends_with('\n') || text.trim().is_empty() {
            return Self::new(text);
        }

        match policy {
            TruncationPolicy::Send => {
                warn!("completion hit the token limit; sending the final line as-is");
                Self::new(text)
            }
            TruncationPolicy::Drop => {
                let cut = text.rfind('\n').map_or(0, |at| at + 1);
                let tail = text.split_off(cut);
                warn!(tail = %tail.trim(), "completion hit the token limit; dropping the incomplete final line");
                Self {
                    text,
                    dropped_tail: Some(tail).filter(|t| !t.trim().is_empty()),
                }
            }
        }
    }

    /// The commands in order. Each call starts from the beginning.
    pub fn commands(&self) -> Commands<'_> {
        split_commands(&self.text)
    }

    pub fn len(&self) -> usize {
        self.commands().count()
    }

    pub fn is_empty(&self) -> bool {
        self.commands().next().is_none()
    }

    /// The incomplete final line discarded by [`TruncationPolicy::Drop`]
    pub fn dropped_tail(&self) -> Option<&str> {
        self.dropped_tail.as_deref()
    }
}
