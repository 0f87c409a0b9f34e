//! Generation client: one prompt in, one completion out.
//!
//! Wraps an [`LlmProvider`] with the run's sampling parameters and turns every
//! way the call can go wrong into a generation error. There is no retry.

use crate::config::Config;
use crate::error::{self, Error, ErrorKind, Result};
use crate::provider::{
    ChatMessage, CompletionRequest, FinishReason, LlmProvider, ProviderError, Usage,
};
use tracing::{debug, info};

/// Sampling parameters sent with every request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    /// Stop sequence; also the marker the model is told to end patches with
    pub stop: Option<String>,
}

impl GenerationParams {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            stop: Some(config.eof_marker.clone()).filter(|s| !s.is_empty()),
        }
    }
}

/// A usable completion
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl Completion {
    /// The model ran out of token budget, so the last line may be cut short
    pub fn hit_token_limit(&self) -> bool {
        self.finish_reason == FinishReason::Length
    }
}

pub struct GenerationClient<P> {
    provider: P,
    params: GenerationParams,
}

impl<P: LlmProvider> GenerationClient<P> {
    pub fn new(provider: P, params: GenerationParams) -> Self {
        Self { provider, params }
    }

    /// Request a completion for a conversation.
    pub async fn generate(&self, messages: Vec<ChatMessage>) -> Result<Completion> {
        if self.params.max_tokens == 0 {
            return Err(error::generation_failed("max_tokens is 0; no completion is possible")
                .with_operation("generate::generate")
                .with_context("model", &self.params.model));
        }

        let mut request = CompletionRequest::new(messages)
            .with_model(&self.params.model)
            .with_max_tokens(self.params.max_tokens)
            .with_temperature(self.params.temperature)
            .with_top_p(self.params.top_p);
        if let Some(stop) = &self.params.stop {
            request = request.with_stop(stop);
        }

        info!(
            provider = self.provider.name(),
            model = %self.params.model,
            max_tokens = self.params.max_tokens,
            "requesting completion"
        );

        let response = self
            .provider
            .complete(request)
            .await
            .map_err(|e| provider_error(e).with_context("model", &self.params.model))?;

        let text = response.content.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(error::generation_failed("model returned an empty completion")
                .with_operation("generate::generate")
                .with_context("model", &self.params.model));
        }

        debug!(
            finish_reason = ?response.finish_reason,
            completion_tokens = response.usage.completion_tokens,
            chars = text.len(),
            "completion received"
        );

        Ok(Completion {
            text,
            finish_reason: response.finish_reason,
            usage: response.usage,
        })
    }
}

fn provider_error(err: ProviderError) -> Error {
    let kind = match &err {
        ProviderError::Network(_) => ErrorKind::NetworkFailed,
        ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
        ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
        ProviderError::Api { .. } | ProviderError::Parse(_) | ProviderError::Other(_) => {
            ErrorKind::GenerationFailed
        }
    };
    let mut out = Error::new(kind, err.to_string()).with_operation("provider::complete");
    if let ProviderError::Api { status, .. } = &err {
        out = out.with_context("status", status.to_string());
    }
    out.set_source(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CompletionResponse, ProviderError};
    use std::sync::Mutex;

    /// Provider double returning canned outcomes and recording requests
    struct CannedProvider {
        reply: Mutex<Option<std::result::Result<CompletionResponse, ProviderError>>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl CannedProvider {
        fn replying(content: Option<&str>, finish_reason: FinishReason) -> Self {
            Self::with(Ok(CompletionResponse {
                id: "1".into(),
                model: "X".into(),
                content: content.map(str::to_string),
                finish_reason,
                usage: Usage::default(),
            }))
        }

        fn with(reply: std::result::Result<CompletionResponse, ProviderError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn default_model(&self) -> &str {
            "X"
        }

        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, ProviderError> {
            self.seen.lock().unwrap().push(request);
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ProviderError::Other("no reply queued".into())))
        }
    }

    fn goal(text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::user(text)]
    }

    fn params(max_tokens: usize) -> GenerationParams {
        GenerationParams {
            model: "X".into(),
            max_tokens,
            temperature: 0.0,
            top_p: 1.0,
            stop: Some("###".into()),
        }
    }

    #[tokio::test]
    async fn test_zero_max_tokens_fails_without_calling_provider() {
        let client = GenerationClient::new(
            CannedProvider::replying(Some("obj"), FinishReason::Stop),
            params(0),
        );

        let err = client.generate(goal("anything")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GenerationFailed);
        assert!(err.is_generation_error());
        assert!(client.provider.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_carries_parameters() {
        let client = GenerationClient::new(
            CannedProvider::replying(Some("create obj\nconnect 0 0\n"), FinishReason::Stop),
            params(50),
        );

        let completion = client.generate(goal("goal")).await.unwrap();
        assert_eq!(completion.text, "create obj\nconnect 0 0\n");
        assert!(!completion.hit_token_limit());

        let seen = client.provider.seen.lock().unwrap();
        assert_eq!(seen[0].model.as_deref(), Some("X"));
        assert_eq!(seen[0].max_tokens, Some(50));
        assert_eq!(seen[0].stop, Some(vec!["###".to_string()]));
    }

    #[tokio::test]
    async fn test_empty_completion_is_generation_error() {
        for content in [None, Some(""), Some("  \n")] {
            let client = GenerationClient::new(
                CannedProvider::replying(content, FinishReason::Stop),
                params(10),
            );
            let err = client.generate(goal("goal")).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::GenerationFailed);
        }
    }

    #[tokio::test]
    async fn test_provider_failures_map_to_generation_errors() {
        let cases = [
            (ProviderError::AuthenticationFailed, ErrorKind::AuthenticationFailed),
            (ProviderError::RateLimited { retry_after: None }, ErrorKind::RateLimited),
            (ProviderError::Network("refused".into()), ErrorKind::NetworkFailed),
            (
                ProviderError::Api { status: 500, message: "boom".into() },
                ErrorKind::GenerationFailed,
            ),
        ];

        for (provider_err, kind) in cases {
            let client = GenerationClient::new(CannedProvider::with(Err(provider_err)), params(10));
            let err = client.generate(goal("goal")).await.unwrap_err();
            assert_eq!(err.kind(), kind);
            assert!(err.is_generation_error());
            assert_eq!(err.operation(), "provider::complete");
        }
    }

    #[tokio::test]
    async fn test_length_finish_reason_is_reported() {
        let client = GenerationClient::new(
            CannedProvider::replying(Some("obj 1 1 osc~;\nconn"), FinishReason::Length),
            params(10),
        );
        assert!(client.generate(goal("goal")).await.unwrap().hit_token_limit());
    }

    #[test]
    fn test_params_from_config() {
        let config = Config::from_toml(
            "model = \"X\"\napi_key = \"k\"\nmax_tokens = 50\ntemperature = 0.3\neof_marker = \"\"",
        )
        .unwrap();
        let params = GenerationParams::from_config(&config);
        assert_eq!(params.max_tokens, 50);
        assert_eq!(params.stop, None);
    }
}
