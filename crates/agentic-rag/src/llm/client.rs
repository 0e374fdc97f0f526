//! Multi-provider LLM client with one-way fallback
//!
//! The client calls the primary provider. If that call fails and the primary
//! is the designated first-choice provider, the request is retried exactly
//! once against the secondary. A failing secondary is never retried against
//! the primary, and a primary that is not the first choice never falls back.

use std::sync::Arc;
use tracing::{debug, warn};

use super::config::{LlmClientConfig, ProviderKind};
use super::provider::{Completion, CompletionRequest, LlmProvider};
use super::rig_adapter::build_provider;
use crate::error::LlmError;

/// Shared, read-only LLM client
#[derive(Clone)]
pub struct LlmClient {
    primary: Arc<dyn LlmProvider>,
    secondary: Option<Arc<dyn LlmProvider>>,
    first_choice: ProviderKind,
}

impl LlmClient {
    /// Client with a single provider and no fallback
    pub fn new(primary: Arc<dyn LlmProvider>) -> Self {
        Self {
            first_choice: primary.kind(),
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: Arc<dyn LlmProvider>) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_first_choice(mut self, kind: ProviderKind) -> Self {
        self.first_choice = kind;
        self
    }

    /// Build rig-backed providers from configuration
    pub fn from_config(config: &LlmClientConfig) -> Result<Self, LlmError> {
        let mut client = Self::new(build_provider(&config.primary)?)
            .with_first_choice(config.first_choice);

        if let Some(secondary) = &config.secondary {
            match build_provider(secondary) {
                Ok(provider) => client = client.with_secondary(provider),
                Err(e) => warn!(provider = %secondary.kind, error = %e, "Secondary provider unavailable, running without fallback"),
            }
        }

        Ok(client)
    }

    pub fn primary_kind(&self) -> ProviderKind {
        self.primary.kind()
    }

    pub fn has_fallback(&self) -> bool {
        self.secondary.is_some() && self.primary.kind() == self.first_choice
    }

    /// Run a single-turn completion
    pub async fn complete(
        &self,
        prompt: &str,
        system: Option<&str>,
        max_tokens: u64,
        temperature: f64,
    ) -> Result<Completion, LlmError> {
        let mut request = CompletionRequest::new(prompt)
            .with_max_tokens(max_tokens)
            .with_temperature(temperature);
        if let Some(system) = system {
            request = request.with_system(system);
        }

        self.complete_request(&request).await
    }

    /// Run a prepared request through the fallback policy
    pub async fn complete_request(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let primary_error = match self.primary.complete(request).await {
            Ok(completion) => {
                debug!(
                    provider = %completion.provider,
                    model = %completion.model,
                    input_tokens = completion.usage.input_tokens,
                    output_tokens = completion.usage.output_tokens,
                    "Completion succeeded"
                );
                return Ok(completion);
            }
            Err(e) => e,
        };

        let secondary = match &self.secondary {
            Some(secondary) if self.primary.kind() == self.first_choice => secondary,
            _ => return Err(primary_error),
        };

        warn!(
            primary = %self.primary.kind(),
            secondary = %secondary.kind(),
            error = %primary_error,
            "Primary provider failed, falling back"
        );

        secondary.complete(request).await
    }
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("primary", &format!("{}/{}", self.primary.kind(), self.primary.model()))
            .field(
                "secondary",
                &self
                    .secondary
                    .as_ref()
                    .map(|s| format!("{}/{}", s.kind(), s.model())),
            )
            .field("first_choice", &self.first_choice)
            .finish()
    }
}
