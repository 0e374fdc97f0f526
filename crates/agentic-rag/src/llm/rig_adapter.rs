//! Adapter for using Rig agents as [`LlmProvider`]s
//!
//! Wraps a Rig `Agent<M>` and drives it through Rig's completion API so the
//! response carries token usage, then normalizes the assistant content into
//! a [`Completion`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use agentic_rag::llm::{build_provider, ProviderKind, ProviderSettings};
//!
//! let settings = ProviderSettings::new(ProviderKind::OpenAI).with_api_key("sk-...");
//! let provider = build_provider(&settings)?;
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use rig::agent::Agent;
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::{Completion as _, CompletionModel, Message as RigMessage};
use rig::message::AssistantContent;
use rig::providers::{anthropic, openai};
use rig::OneOrMany;

use super::config::{ProviderKind, ProviderSettings, TokenUsage};
use super::provider::{Completion, CompletionRequest, LlmProvider};
use crate::error::LlmError;

/// Adapter that wraps a Rig `Agent<M>` to implement `LlmProvider`.
pub struct RigProvider<M>
where
    M: CompletionModel + Send + Sync,
{
    agent: Arc<Agent<M>>,
    kind: ProviderKind,
    model: String,
}

impl<M> RigProvider<M>
where
    M: CompletionModel + Send + Sync,
{
    pub fn new(agent: Agent<M>, kind: ProviderKind, model: impl Into<String>) -> Self {
        Self {
            agent: Arc::new(agent),
            kind,
            model: model.into(),
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigProvider<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let provider_error = |e: &dyn std::fmt::Display| LlmError::provider(self.kind.as_str(), e.to_string());

        let mut builder = self
            .agent
            .completion(RigMessage::user(request.prompt.clone()), Vec::new())
            .await
            .map_err(|e| provider_error(&e))?;

        if let Some(system) = &request.system {
            builder = builder.preamble(system.clone());
        }

        let response = builder
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .send()
            .await
            .map_err(|e| provider_error(&e))?;

        let content = text_from_choice(&response.choice);
        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse(self.kind.to_string()));
        }

        Ok(Completion::new(content, self.kind, self.model.clone())
            .with_usage(TokenUsage::from_rig_usage(&response.usage)))
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl<M> std::fmt::Debug for RigProvider<M>
where
    M: CompletionModel + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RigProvider")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .finish()
    }
}

/// Concatenate the text parts of an assistant response
fn text_from_choice(choice: &OneOrMany<AssistantContent>) -> String {
    choice
        .iter()
        .filter_map(|item| match item {
            AssistantContent::Text(text) => Some(text.text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}

/// Build a rig-backed provider from settings
pub fn build_provider(settings: &ProviderSettings) -> Result<Arc<dyn LlmProvider>, LlmError> {
    let api_key = settings
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| {
            LlmError::MissingCredentials(format!("no API key configured for {}", settings.kind))
        })?;

    let provider: Arc<dyn LlmProvider> = match settings.kind {
        ProviderKind::OpenAI => {
            let client = openai::Client::from_val(api_key.into());
            let agent = client.agent(&settings.model).build();
            Arc::new(RigProvider::new(agent, ProviderKind::OpenAI, &settings.model))
        }
        ProviderKind::Anthropic => {
            let client = anthropic::Client::from_val(api_key);
            let agent = client.agent(&settings.model).build();
            Arc::new(RigProvider::new(agent, ProviderKind::Anthropic, &settings.model))
        }
    };

    Ok(provider)
}
