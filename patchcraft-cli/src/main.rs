//! # Patchcraft CLI
//!
//! Generate a Pure Data patch with a language model and replay it into a
//! running Pd instance.
//!
//! Usage:
//!   patchcraft
//!   patchcraft <goal>
//!   patchcraft --config other.toml --interactive
//!
//! Examples:
//!   patchcraft
//!   patchcraft "Create a noise generator"
//!   patchcraft -i            (one goal per line on stdin)
//!   patchcraft --print-prompt "Create a low pass filter"

use clap::Parser;
use patchcraft_agent::{Agent, AgentResult};
use patchcraft_core::{
    Config, DispatchReport, Error, OpenAIProvider, PatchChannel, PdLauncher, PromptBuilder,
    ProviderConfig, Reporter, TcpChannel, DEFAULT_CONFIG_PATH,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "patchcraft")]
#[command(author, version, about = "Patchcraft - LLM-generated patches replayed into Pure Data")]
struct Cli {
    /// Goal for this run (defaults to `goal` from the config)
    #[arg(trailing_var_arg = true)]
    goal: Vec<String>,

    /// Path to the TOML configuration document
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Read goals from stdin, one per line, sharing one prompt history
    #[arg(short, long)]
    interactive: bool,

    /// Print the prompt that would be sent and exit
    #[arg(long)]
    print_prompt: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "patchcraft=debug,patchcraft_core=debug,patchcraft_agent=debug"
    } else {
        "patchcraft=info,patchcraft_core=info,patchcraft_agent=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_result(result: &AgentResult) -> std::io::Result<()> {
    let mut reporter = Reporter::stdout();
    reporter.script(&result.script)?;
    reporter.report(&result.report)
}

/// One goal: generate, replay, report. Dispatch errors are reported, not returned.
async fn run_goal<C: PatchChannel>(
    agent: &mut Agent<OpenAIProvider, C>,
    goal: &str,
) -> Result<(), Error> {
    let result = agent.run(goal).await?;
    print_result(&result).map_err(|e| Error::from(e).with_operation("cli::report"))?;
    replay_outcome(result.report)
}

/// Rejected commands are logged and leave the run successful; only a broken
/// channel fails it.
fn replay_outcome(report: DispatchReport) -> Result<(), Error> {
    for rejection in report.results.iter().filter_map(|r| r.error()) {
        warn!(error = %rejection, "command rejected");
    }
    match report.interrupted {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn exit_code(result: &Result<(), Error>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

async fn run_interactive<C: PatchChannel>(agent: &mut Agent<OpenAIProvider, C>) -> Result<(), Error> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    eprintln!("Enter a goal per line (Ctrl-D to quit).");

    while let Some(line) = lines.next_line().await? {
        let goal = line.trim();
        if goal.is_empty() {
            continue;
        }
        match run_goal(agent, goal).await {
            Ok(()) => {}
            // The channel is gone; nothing further can be replayed.
            Err(err) if !err.is_generation_error() => return Err(err),
            Err(err) => error!(error = %err, "generation failed"),
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Error> {
    let config = Config::load(&cli.config)?;
    let goal = if cli.goal.is_empty() {
        config.goal.clone()
    } else {
        cli.goal.join(" ")
    };

    if cli.print_prompt {
        let prompts = PromptBuilder::new(&config.eof_marker);
        println!("{}", prompts.build(&goal));
        return Ok(());
    }

    let provider = OpenAIProvider::new(ProviderConfig::from_config(&config)).map_err(|e| {
        Error::config_invalid(e.to_string()).with_operation("cli::provider")
    })?;
    // Pd keeps running after we exit so the patch stays open.
    let _pd = match PdLauncher::from_config(&config.environment) {
        Some(launcher) => Some(launcher.launch().await?),
        None => None,
    };
    let channel = TcpChannel::connect(&config.environment.address()).await?;
    let mut agent = Agent::from_config(&config, provider, channel);

    if cli.interactive {
        run_interactive(&mut agent).await
    } else {
        run_goal(&mut agent, &goal).await
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = run(cli).await;
    match &result {
        Ok(()) => info!("done"),
        Err(err) => eprintln!("Error: {}", err),
    }
    exit_code(&result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchcraft_core::{DispatchResult, ErrorKind, Outcome};

    fn result(index: usize, command: &str, outcome: Outcome) -> DispatchResult {
        DispatchResult { index, command: command.into(), outcome }
    }

    #[test]
    fn test_rejected_commands_do_not_fail_the_run() {
        let report = DispatchReport {
            results: vec![
                result(0, "obj 10 10 osc~;", Outcome::Acked),
                result(1, "obj 10 40 nope;", Outcome::Errored { reason: "couldn't create".into() }),
                result(2, "connect 0 0 1 0;", Outcome::Acked),
            ],
            interrupted: None,
        };

        let outcome = replay_outcome(report);
        assert!(outcome.is_ok());
        assert_eq!(exit_code(&outcome), ExitCode::SUCCESS);
    }

    #[test]
    fn test_interrupted_replay_exits_with_failure() {
        let report = DispatchReport {
            results: vec![result(0, "obj 10 10 osc~;", Outcome::Acked)],
            interrupted: Some(Error::channel_closed("localhost:3001")),
        };

        let outcome = replay_outcome(report);
        assert_eq!(outcome.as_ref().unwrap_err().kind(), ErrorKind::ChannelClosed);
        assert_eq!(exit_code(&outcome), ExitCode::FAILURE);
    }

    #[test]
    fn test_cli_arguments() {
        let cli = Cli::parse_from(["patchcraft", "-c", "other.toml", "Create", "a", "noise", "generator"]);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert_eq!(cli.goal.join(" "), "Create a noise generator");
        assert!(!cli.interactive);

        let cli = Cli::parse_from(["patchcraft", "--interactive"]);
        assert!(cli.interactive);
        assert!(cli.goal.is_empty());
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }
}
