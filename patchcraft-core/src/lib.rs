//! # Patchcraft Core
//!
//! Generate a Pure Data patch with a language model and replay it, command by
//! command, against a running patching environment.
//!
//! ## Core Concepts
//! - **Config**: typed settings loaded once from TOML
//! - **Prompt**: fixed preamble plus the operator's goal
//! - **Generation**: one chat completion under a token budget
//! - **Script**: the completion split into ordered command lines
//! - **Dispatch**: each command sent in order, each reply classified as ack or error
//! - **Report**: per-command outcomes for the operator
//! - **Launcher**: optionally starts Pd with the receiver patch open

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod generate;
pub mod launcher;
pub mod prompt;
pub mod provider;
pub mod report;
pub mod script;

pub use channel::{LineChannel, PatchChannel, TcpChannel};
pub use config::{Config, EnvironmentConfig, TruncationPolicy, API_KEY_ENV, DEFAULT_CONFIG_PATH};
pub use dispatch::{
    CommandState, DispatchReport, DispatchResult, Dispatcher, Outcome, CLEAR_COMMAND,
};
pub use error::{Error, ErrorKind, ErrorStatus, Result};
pub use generate::{Completion, GenerationClient, GenerationParams};
pub use launcher::PdLauncher;
pub use prompt::{extract_patch_body, PromptBuilder};
pub use provider::{
    ChatMessage, CompletionRequest, CompletionResponse, FinishReason, LlmProvider,
    OpenAIProvider, ProviderConfig, ProviderError, Role, Usage,
};
pub use report::Reporter;
pub use script::{split_commands, Commands, Script};
