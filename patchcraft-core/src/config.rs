//! # Configuration
//!
//! Patchcraft is driven entirely by one TOML document, loaded once at startup
//! into a [`Config`] and passed by reference to every component.
//!
//! ```toml
//! model = "gpt-3.5-turbo"
//! api_key = "sk-..."
//! max_tokens = 2000
//! temperature = 0.0
//!
//! [environment]
//! host = "localhost"
//! port = 3001
//! ```
//!
//! Required keys fail fast at load time rather than deep inside generation.

use crate::error::{self, Error, ErrorKind, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default location of the configuration document
pub const DEFAULT_CONFIG_PATH: &str = "patchcraft.toml";

/// Environment variable consulted when `api_key` is absent from the document
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

const DEFAULT_GOAL: &str = "Return a Pure Data patcher that generates a sine wave.";

/// Validated run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub model: String,
    pub api_key: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub base_url: String,
    pub timeout_secs: u64,
    /// Sentinel the model appends after the patch; also sent as `stop`
    pub eof_marker: String,
    /// Goal text used when none is given on the command line
    pub goal: String,
    /// Number of non-system messages kept in the prompt history
    pub history_window: usize,
    pub environment: EnvironmentConfig,
}

/// Where the patching environment listens and how it replies
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnvironmentConfig {
    pub host: String,
    pub port: u16,
    /// Reply token meaning the command was accepted
    pub ack: String,
    /// Send `clear;` before replaying a script
    pub clear_before_run: bool,
    pub truncation: TruncationPolicy,
    /// Pd executable to start before connecting; unset when Pd is already running
    pub pd_path: Option<PathBuf>,
    /// Patch Pd opens on start; it listens on `port` and answers each command
    pub receiver_patch: PathBuf,
    /// Pause between starting Pd and connecting to it
    pub startup_delay_ms: u64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3001,
            ack: "ack".to_string(),
            clear_before_run: true,
            truncation: TruncationPolicy::Drop,
            pd_path: None,
            receiver_patch: PathBuf::from("receive.pd"),
            startup_delay_ms: 2000,
        }
    }
}

impl EnvironmentConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// What to do with the final line of a completion cut off by the token budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TruncationPolicy {
    /// Discard the incomplete line
    #[default]
    Drop,
    /// Dispatch it as-is and let the environment judge it
    Send,
}

/// Shape of the document on disk; every field optional so that missing keys
/// produce a `ConfigInvalid` naming the key instead of a serde message.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    model: Option<String>,
    api_key: Option<String>,
    max_tokens: Option<usize>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    eof_marker: Option<String>,
    goal: Option<String>,
    history_window: Option<usize>,
    #[serde(default)]
    environment: EnvironmentConfig,
}

impl Config {
    /// Load and validate the document at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("config::load")
                .with_context("path", path.display().to_string())
        })?;
        debug!(path = %path.display(), "loaded configuration document");

        Self::from_toml_with_env(&text, std::env::var(API_KEY_ENV).ok())
            .map_err(|e| e.with_context("path", path.display().to_string()))
    }

    /// Parse and validate a TOML document without consulting the environment.
    pub fn from_toml(text: &str) -> Result<Self> {
        Self::from_toml_with_env(text, None)
    }

    /// Parse and validate, using `env_api_key` when the document has no key.
    pub fn from_toml_with_env(text: &str, env_api_key: Option<String>) -> Result<Self> {
        let raw: RawConfig = toml::from_str(text).map_err(|e| {
            Error::new(ErrorKind::ConfigInvalid, e.message().to_string())
                .with_operation("config::parse")
                .set_source(e)
        })?;
        raw.validate(env_api_key)
    }
}

fn missing(key: &'static str) -> Error {
    error::config_invalid(key, "required key is missing")
}

impl RawConfig {
    fn validate(self, env_api_key: Option<String>) -> Result<Config> {
        let model = self.model.filter(|m| !m.trim().is_empty()).ok_or_else(|| missing("model"))?;
        let api_key = self
            .api_key
            .filter(|k| !k.trim().is_empty())
            .or(env_api_key)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| missing("api_key"))?;
        let max_tokens = self.max_tokens.ok_or_else(|| missing("max_tokens"))?;
        let temperature = self.temperature.ok_or_else(|| missing("temperature"))?;
        let top_p = self.top_p.unwrap_or(1.0);

        if !(0.0..=2.0).contains(&temperature) {
            return Err(error::config_invalid(
                "temperature",
                format!("{} is outside 0.0..=2.0", temperature),
            ));
        }
        if !(0.0..=1.0).contains(&top_p) {
            return Err(error::config_invalid("top_p", format!("{} is outside 0.0..=1.0", top_p)));
        }
        let timeout_secs = self.timeout_secs.unwrap_or(120);
        if timeout_secs == 0 {
            return Err(error::config_invalid("timeout_secs", "timeout must be at least 1 second"));
        }
        if self.environment.port == 0 {
            return Err(error::config_invalid("environment.port", "port must be non-zero"));
        }
        if self.environment.ack.trim().is_empty() {
            return Err(error::config_invalid("environment.ack", "ack token must not be empty"));
        }

        Ok(Config {
            model,
            api_key,
            max_tokens,
            temperature,
            top_p,
            base_url: self
                .base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            timeout_secs,
            eof_marker: self.eof_marker.unwrap_or_else(|| "###".to_string()),
            goal: self.goal.unwrap_or_else(|| DEFAULT_GOAL.to_string()),
            history_window: self.history_window.unwrap_or(5),
            environment: self.environment,
        })
    }
}
