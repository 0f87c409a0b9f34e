//! # Patchcraft Agent
//!
//! The agent runs the model <-> environment cycle for each goal:
//! 1. The goal is wrapped in the Pure Data preamble and appended to the prompt history
//! 2. The model returns a patch
//! 3. The patch is reduced to command lines
//! 4. The canvas is cleared and each command is replayed in order
//! 5. Rejected commands are reported; fixing them is left to the operator's next goal

mod agent;
mod history;

pub use agent::{Agent, AgentConfig, AgentResult};
pub use history::PromptHistory;
