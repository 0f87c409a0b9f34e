//! Agent implementation - drives one generate/dispatch cycle per goal

use crate::history::PromptHistory;
use patchcraft_core::{
    extract_patch_body, Completion, Config, DispatchReport, Dispatcher, GenerationClient,
    GenerationParams, LlmProvider, PatchChannel, PromptBuilder, Result, Script, TruncationPolicy,
};
use tracing::{debug, info, warn};

/// Configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Send `clear;` before replaying each patch
    pub clear_before_run: bool,
    pub truncation: TruncationPolicy,
    pub eof_marker: String,
    /// Non-system messages kept between goals
    pub history_window: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            clear_before_run: true,
            truncation: TruncationPolicy::Drop,
            eof_marker: "###".to_string(),
            history_window: 5,
        }
    }
}

impl AgentConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            clear_before_run: config.environment.clear_before_run,
            truncation: config.environment.truncation,
            eof_marker: config.eof_marker.clone(),
            history_window: config.history_window,
        }
    }
}

/// Result of one goal
pub struct AgentResult {
    pub completion: Completion,
    /// The commands that were replayed
    pub script: Script,
    pub report: DispatchReport,
}

/// The agent - owns the model client and the environment connection
pub struct Agent<P, C> {
    client: GenerationClient<P>,
    dispatcher: Dispatcher<C>,
    prompts: PromptBuilder,
    history: PromptHistory,
    config: AgentConfig,
}

impl<P: LlmProvider, C: PatchChannel> Agent<P, C> {
    pub fn new(client: GenerationClient<P>, dispatcher: Dispatcher<C>, config: AgentConfig) -> Self {
        let prompts = PromptBuilder::new(&config.eof_marker);
        let history = PromptHistory::new(prompts.system_prompt(), config.history_window);
        Self {
            client,
            dispatcher,
            prompts,
            history,
            config,
        }
    }

    /// Wire an agent from the run configuration
    pub fn from_config(config: &Config, provider: P, channel: C) -> Self {
        Self::new(
            GenerationClient::new(provider, GenerationParams::from_config(config)),
            Dispatcher::new(channel, &config.environment.ack),
            AgentConfig::from_config(config),
        )
    }

    pub fn history(&self) -> &PromptHistory {
        &self.history
    }

    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.dispatcher
    }

    /// Ask the model for a patch and turn it into a script.
    ///
    /// The goal and the model's answer are added to the prompt history; a
    /// failed generation leaves the history as it was.
    pub async fn generate_script(&mut self, goal: &str) -> Result<(Completion, Script)> {
        self.history.push_user(self.prompts.user_prompt(goal));

        let completion = match self.client.generate(self.history.messages()).await {
            Ok(completion) => completion,
            Err(err) => {
                self.history.abandon_user();
                return Err(err.with_context("goal", goal));
            }
        };
        self.history.push_assistant(&completion.text);

        let body = extract_patch_body(&completion.text, &self.config.eof_marker);
        let script = Script::from_completion(
            body,
            completion.hit_token_limit(),
            self.config.truncation,
        );
        debug!(commands = script.len(), "script ready");

        if script.is_empty() {
            warn!("completion contained no commands");
        }

        Ok((completion, script))
    }

    /// Replay `script`, clearing the canvas first if configured.
    pub async fn dispatch(&mut self, script: &Script) -> Result<DispatchReport> {
        if self.config.clear_before_run {
            self.dispatcher
                .clear()
                .await
                .map_err(|e| e.with_operation("agent::clear"))?;
        }

        let report = self.dispatcher.run(script).await;
        info!(
            sent = report.results.len(),
            acked = report.acked(),
            errored = report.errored(),
            complete = report.is_complete(),
            "dispatch finished"
        );
        Ok(report)
    }

    /// Generate a patch for `goal` and replay it.
    pub async fn run(&mut self, goal: &str) -> Result<AgentResult> {
        info!(goal, "running goal");
        let (completion, script) = self.generate_script(goal).await?;
        let report = self.dispatch(&script).await?;
        Ok(AgentResult {
            completion,
            script,
            report,
        })
    }
}
