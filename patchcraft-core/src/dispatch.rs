//! # Dispatch loop
//!
//! Replays a [`Script`] against the patching environment, one command at a
//! time and in script order. Each command moves through
//! `Sent -> AwaitingReply -> {Acked | Errored}`; an `Errored` command is
//! recorded and the loop moves on. Only a broken channel stops the loop.

use crate::channel::PatchChannel;
use crate::error::{Error, Result};
use crate::script::Script;
use tracing::{debug, warn};

/// Command that empties the environment's canvas before a replay
pub const CLEAR_COMMAND: &str = "clear;";

/// Where a single command is in its exchange with the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    Sent,
    AwaitingReply,
    Acked,
    Errored,
}

impl CommandState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CommandState::Acked | CommandState::Errored)
    }
}

/// How the environment answered one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Acked,
    /// The environment's error text, passed through unchanged
    Errored { reason: String },
}

impl Outcome {
    /// Classify a reply line against the acknowledgment token.
    ///
    /// Surrounding whitespace and a trailing `;` are ignored.
    pub fn classify(reply: &str, ack: &str) -> Self {
        let token = reply.trim();
        if token.trim_end_matches(';').trim_end() == ack {
            return Outcome::Acked;
        }
        let reason = if token.is_empty() {
            "empty reply".to_string()
        } else {
            token.to_string()
        };
        Outcome::Errored { reason }
    }

    pub fn is_acked(&self) -> bool {
        matches!(self, Outcome::Acked)
    }

    pub fn state(&self) -> CommandState {
        match self {
            Outcome::Acked => CommandState::Acked,
            Outcome::Errored { .. } => CommandState::Errored,
        }
    }
}

/// One dispatched command and its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Zero-based position in the script
    pub index: usize,
    pub command: String,
    pub outcome: Outcome,
}

impl DispatchResult {
    /// The rejection as a `DispatchRejected` error, if the command errored
    pub fn error(&self) -> Option<Error> {
        match &self.outcome {
            Outcome::Acked => None,
            Outcome::Errored { reason } => Some(
                Error::dispatch_rejected(&self.command, reason)
                    .with_operation("dispatch::run")
                    .with_context("index", self.index.to_string()),
            ),
        }
    }
}

/// Everything one replay produced
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub results: Vec<DispatchResult>,
    /// Transport failure that stopped the loop early
    pub interrupted: Option<Error>,
}

impl DispatchReport {
    pub fn acked(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_acked()).count()
    }

    pub fn errored(&self) -> usize {
        self.results.len() - self.acked()
    }

    pub fn outcomes(&self) -> Vec<CommandState> {
        self.results.iter().map(|r| r.outcome.state()).collect()
    }

    /// Every command was sent and answered
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }
}

/// Drives a [`PatchChannel`] through a script
pub struct Dispatcher<C> {
    channel: C,
    ack: String,
}

impl<C: PatchChannel> Dispatcher<C> {
    pub fn new(channel: C, ack: impl Into<String>) -> Self {
        Self {
            channel,
            ack: ack.into(),
        }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Send one command and classify its reply.
    pub async fn dispatch(&mut self, command: &str) -> Result<Outcome> {
        self.channel.send_line(command).await?;
        let mut state = CommandState::Sent;
        debug!(command, ?state, "transition");

        state = CommandState::AwaitingReply;
        debug!(command, ?state, "transition");
        let reply = self.channel.read_reply().await?;

        let outcome = Outcome::classify(&reply, &self.ack);
        state = outcome.state();
        debug_assert!(state.is_terminal());
        debug!(command, ?state, "transition");
        Ok(outcome)
    }

    /// Empty the canvas. The outcome is returned but not part of any report.
    pub async fn clear(&mut self) -> Result<Outcome> {
        let outcome = self.dispatch(CLEAR_COMMAND).await?;
        if let Outcome::Errored { reason } = &outcome {
            warn!(reason = %reason, "environment did not acknowledge clear");
        }
        Ok(outcome)
    }

    /// Replay every command of `script` in order.
    ///
    /// Rejected commands are recorded and skipped past. A channel failure
    /// ends the replay; the results gathered so far are kept and the failure
    /// is stored in [`DispatchReport::interrupted`].
    pub async fn run(&mut self, script: &Script) -> DispatchReport {
        let mut report = DispatchReport::default();

        for (index, command) in script.commands().enumerate() {
            match self.dispatch(command).await {
                Ok(outcome) => {
                    if let Outcome::Errored { reason } = &outcome {
                        warn!(index, command, reason = %reason, "command rejected");
                    }
                    report.results.push(DispatchResult {
                        index,
                        command: command.to_string(),
                        outcome,
                    });
                }
                Err(err) => {
                    let err = err
                        .with_operation("dispatch::run")
                        .with_context("index", index.to_string())
                        .with_context("peer", self.channel.peer());
                    warn!(error = %err, "dispatch interrupted");
                    report.interrupted = Some(err);
                    break;
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LineChannel;
    use crate::error::ErrorKind;
    use std::collections::VecDeque;

    /// In-memory environment: records commands, answers from a queue
    struct ScriptedEnvironment {
        sent: Vec<String>,
        replies: VecDeque<Result<String>>,
    }

    impl ScriptedEnvironment {
        fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                sent: Vec::new(),
                replies: replies.into(),
            }
        }

        /// Acks everything except commands containing "bad"
        fn judging(commands: &[&str]) -> Self {
            Self::new(
                commands
                    .iter()
                    .map(|c| {
                        Ok(if c.contains("bad") {
                            format!("error: {}: couldn't create", c)
                        } else {
                            "ack".to_string()
                        })
                    })
                    .collect(),
            )
        }
    }

    impl PatchChannel for ScriptedEnvironment {
        fn peer(&self) -> &str {
            "scripted"
        }

        async fn send_line(&mut self, command: &str) -> Result<()> {
            self.sent.push(command.to_string());
            Ok(())
        }

        async fn read_reply(&mut self) -> Result<String> {
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(crate::error::channel_closed("scripted")))
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(Outcome::classify("ack", "ack"), Outcome::Acked);
        assert_eq!(Outcome::classify("  ack; \r", "ack"), Outcome::Acked);
        assert_eq!(
            Outcome::classify("error: osc~: bad arguments", "ack"),
            Outcome::Errored { reason: "error: osc~: bad arguments".into() }
        );
        assert_eq!(
            Outcome::classify("", "ack"),
            Outcome::Errored { reason: "empty reply".into() }
        );
        assert!(!Outcome::classify("acknowledged", "ack").is_acked());
    }

    #[tokio::test]
    async fn test_dispatch_preserves_script_order() {
        let script = Script::new("obj 10 10 osc~;\nobj 10 40 dac~;\n\nconnect 0 0 1 0;\n");
        let mut dispatcher = Dispatcher::new(
            ScriptedEnvironment::judging(&["a", "b", "c"]),
            "ack",
        );

        let report = dispatcher.run(&script).await;
        let sent = &dispatcher.channel().sent;
        assert_eq!(sent, &vec!["obj 10 10 osc~;", "obj 10 40 dac~;", "connect 0 0 1 0;"]);
        for (nth, result) in report.results.iter().enumerate() {
            assert_eq!(result.index, nth);
            assert_eq!(result.command, sent[nth]);
        }
    }

    #[tokio::test]
    async fn test_error_does_not_halt_run() {
        let commands = ["good", "bad", "good2"];
        let script = Script::new(commands.join("\n"));
        let mut dispatcher = Dispatcher::new(ScriptedEnvironment::judging(&commands), "ack");

        let report = dispatcher.run(&script).await;
        assert_eq!(
            report.outcomes(),
            vec![CommandState::Acked, CommandState::Errored, CommandState::Acked]
        );
        assert!(report.is_complete());
        assert_eq!(report.acked(), 2);
        assert_eq!(report.errored(), 1);

        let err = report.results[1].error().unwrap();
        assert_eq!(err.kind(), ErrorKind::DispatchRejected);
        assert_eq!(err.message(), "error: bad: couldn't create");
        assert!(report.results[0].error().is_none());
    }

    #[tokio::test]
    async fn test_channel_failure_interrupts_and_keeps_results() {
        let script = Script::new("one\ntwo\nthree\n");
        let mut dispatcher = Dispatcher::new(
            ScriptedEnvironment::new(vec![Ok("ack".into())]),
            "ack",
        );

        let report = dispatcher.run(&script).await;
        assert_eq!(report.results.len(), 1);
        assert!(!report.is_complete());

        let err = report.interrupted.unwrap();
        assert_eq!(err.kind(), ErrorKind::ChannelClosed);
        assert_eq!(err.operation(), "dispatch::run");
        assert!(err.context().contains(&("index", "1".to_string())));
        // "three" was never sent.
        assert_eq!(dispatcher.channel().sent, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_clear_uses_clear_command() {
        let mut dispatcher = Dispatcher::new(
            ScriptedEnvironment::new(vec![Ok("ack".into())]),
            "ack",
        );
        assert_eq!(dispatcher.clear().await.unwrap(), Outcome::Acked);
        assert_eq!(dispatcher.channel().sent, vec![CLEAR_COMMAND]);
    }

    #[tokio::test]
    async fn test_empty_script_sends_nothing() {
        let mut dispatcher = Dispatcher::new(ScriptedEnvironment::new(vec![]), "ack");
        let report = dispatcher.run(&Script::new("\n\n")).await;
        assert!(report.results.is_empty());
        assert!(report.is_complete());
        assert!(dispatcher.channel().sent.is_empty());
    }

    #[tokio::test]
    async fn test_run_over_line_channel() {
        let mock = tokio_test::io::Builder::new()
            .write(b"create obj\n")
            .read(b"ack\n")
            .write(b"connect 0 0\n")
            .read(b"error: connect: no such object\n")
            .build();
        let mut dispatcher = Dispatcher::new(LineChannel::new(mock, "mock"), "ack");

        let report = dispatcher.run(&Script::new("create obj\nconnect 0 0\n")).await;
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results[0].outcome, Outcome::Acked);
        assert_eq!(
            report.results[1].outcome,
            Outcome::Errored { reason: "error: connect: no such object".into() }
        );
    }
}
