//! Operator-facing summary of a replay.
//!
//! Written to stdout by the CLI; logs go to stderr separately.

use crate::dispatch::{DispatchReport, Outcome};
use crate::script::Script;
use std::io::{self, Write};

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len).collect();
        format!("{}…", cut)
    }
}

/// Longest command text shown in the dispatch listing before eliding
const COMMAND_WIDTH: usize = 60;

/// Prints dispatch results, one line per command
pub struct Reporter<W> {
    out: W,
}

impl Reporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Print the generated commands before they are replayed
    pub fn script(&mut self, script: &Script) -> io::Result<()> {
        writeln!(self.out, "--- Patch ({} commands) ---", script.len())?;
        for command in script.commands() {
            writeln!(self.out, "{}", command)?;
        }
        if let Some(tail) = script.dropped_tail() {
            writeln!(self.out, "(dropped incomplete final line: {:?})", tail)?;
        }
        writeln!(self.out)
    }

    /// Print per-command outcomes followed by a one-line summary
    pub fn report(&mut self, report: &DispatchReport) -> io::Result<()> {
        writeln!(self.out, "--- Dispatch ({} sent) ---", report.results.len())?;
        for result in &report.results {
            let command = truncate(&result.command, COMMAND_WIDTH);
            match &result.outcome {
                Outcome::Acked => {
                    writeln!(self.out, "  {:3}. ok    {}", result.index + 1, command)?
                }
                Outcome::Errored { reason } => writeln!(
                    self.out,
                    "  {:3}. error {} -> {}",
                    result.index + 1,
                    command,
                    reason
                )?,
            }
        }

        writeln!(
            self.out,
            "{} acked, {} errored",
            report.acked(),
            report.errored()
        )?;
        if let Some(err) = &report.interrupted {
            writeln!(self.out, "interrupted: {}", err)?;
        }
        if report.errored() > 0 {
            writeln!(
                self.out,
                "Rejected commands need a corrected prompt; nothing is retried."
            )?;
        }
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TruncationPolicy;
    use crate::dispatch::DispatchResult;

    fn render(report: &DispatchReport) -> String {
        let mut out = Vec::new();
        Reporter::new(&mut out).report(report).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_report_lists_results_in_order() {
        let report = DispatchReport {
            results: vec![
                DispatchResult { index: 0, command: "create obj".into(), outcome: Outcome::Acked },
                DispatchResult {
                    index: 1,
                    command: "connect 0 0".into(),
                    outcome: Outcome::Errored { reason: "error: no such object".into() },
                },
            ],
            interrupted: None,
        };

        let text = render(&report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "--- Dispatch (2 sent) ---");
        assert_eq!(lines[1], "    1. ok    create obj");
        assert_eq!(lines[2], "    2. error connect 0 0 -> error: no such object");
        assert_eq!(lines[3], "1 acked, 1 errored");
        assert!(text.contains("nothing is retried"));
    }

    #[test]
    fn test_report_interrupted() {
        let report = DispatchReport {
            results: vec![],
            interrupted: Some(crate::error::channel_closed("localhost:3001")),
        };
        let text = render(&report);
        assert!(text.contains("interrupted: ChannelClosed"));
        assert!(!text.contains("nothing is retried"));
    }

    #[test]
    fn test_long_commands_are_elided() {
        let report = DispatchReport {
            results: vec![DispatchResult {
                index: 0,
                command: "x".repeat(100),
                outcome: Outcome::Acked,
            }],
            interrupted: None,
        };
        let text = render(&report);
        assert!(text.contains(&format!(" {}…\n", "x".repeat(COMMAND_WIDTH))));
    }

    #[test]
    fn test_script_listing_notes_dropped_tail() {
        let script = Script::from_completion("obj 1 1 osc~;\nconn", true, TruncationPolicy::Drop);
        let mut out = Vec::new();
        Reporter::new(&mut out).script(&script).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("--- Patch (1 commands) ---\nobj 1 1 osc~;\n"));
        assert!(text.contains("dropped incomplete final line: \"conn\""));
    }
}
