//! LLM Provider trait definition
//!
//! Defines the core abstraction for interacting with LLM providers.
//! Every implementation normalizes its provider's response into one
//! [`Completion`] before returning, so stages never see provider-specific
//! shapes.

use async_trait::async_trait;

use super::config::{ProviderKind, TokenUsage};
use super::pricing::calculate_cost;
use crate::error::LlmError;

/// A single-turn completion request
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// System preamble
    pub system: Option<String>,
    pub max_tokens: u64,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            max_tokens: 1024,
            temperature: 0.0,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Canonical completion result
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    /// Provider that actually served the request
    pub provider: ProviderKind,
    pub model: String,
    pub usage: TokenUsage,
}

impl Completion {
    pub fn new(content: impl Into<String>, provider: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            provider,
            model: model.into(),
            usage: TokenUsage::default(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// USD cost of this completion from the static price table
    pub fn cost(&self) -> f64 {
        calculate_cost(
            self.provider,
            &self.model,
            self.usage.input_tokens,
            self.usage.output_tokens,
        )
    }
}

/// Core LLM Provider trait
///
/// Implementations must be safe to share across concurrent queries; they are
/// held behind `Arc` and only read.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;

    /// Provider identity, used for fallback decisions and pricing
    fn kind(&self) -> ProviderKind;

    /// Model identifier served by this provider
    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            Ok(Completion::new(
                format!("echo: {}", request.prompt),
                self.kind(),
                self.model(),
            )
            .with_usage(TokenUsage::new(10, 5)))
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAI
        }

        fn model(&self) -> &str {
            "gpt-4o-mini"
        }
    }

    #[tokio::test]
    async fn test_provider_complete() {
        let request = CompletionRequest::new("Hello")
            .with_system("Be brief")
            .with_max_tokens(64)
            .with_temperature(0.2);

        let completion = EchoProvider.complete(&request).await.unwrap();

        assert_eq!(completion.content, "echo: Hello");
        assert_eq!(completion.provider, ProviderKind::OpenAI);
        assert_eq!(completion.usage.total_tokens, 15);
        assert!(completion.cost() > 0.0);
    }

    #[test]
    fn test_completion_without_usage_costs_nothing() {
        let completion = Completion::new("hi", ProviderKind::Anthropic, "unknown-model");
        assert_eq!(completion.cost(), 0.0);
    }

    #[test]
    fn test_request_defaults() {
        let request = CompletionRequest::new("q");
        assert!(request.system.is_none());
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.max_tokens, 1024);
    }
}
