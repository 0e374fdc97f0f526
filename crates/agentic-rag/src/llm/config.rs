//! LLM configuration types
//!
//! Provider identities, per-provider settings, and token usage tracking.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LlmError;

/// Token usage statistics from an LLM completion.
///
/// # Example
///
/// ```
/// use agentic_rag::llm::TokenUsage;
///
/// let usage = TokenUsage::new(100, 50);
/// assert_eq!(usage.total_tokens, 150);
///
/// let total = usage + TokenUsage::new(200, 75);
/// assert_eq!(total.total_tokens, 425);
/// ```
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenUsage {
    /// Number of tokens in the input/prompt
    pub input_tokens: u64,
    /// Number of tokens in the generated output
    pub output_tokens: u64,
    /// Total tokens (input + output)
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a new TokenUsage with calculated total
    pub fn new(input: u64, output: u64) -> Self {
        Self {
            input_tokens: input,
            output_tokens: output,
            total_tokens: input + output,
        }
    }

    /// Create from rig-core Usage struct
    pub fn from_rig_usage(usage: &rig::completion::Usage) -> Self {
        Self::new(usage.input_tokens, usage.output_tokens)
    }
}

impl std::ops::Add for TokenUsage {
    type Output = Self;

    fn add(self, other: Self) -> Self::Output {
        Self {
            input_tokens: self.input_tokens + other.input_tokens,
            output_tokens: self.output_tokens + other.output_tokens,
            total_tokens: self.total_tokens + other.total_tokens,
        }
    }
}

/// Supported LLM providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
        }
    }

    /// The other provider, used as the default fallback
    pub fn counterpart(&self) -> Self {
        match self {
            ProviderKind::OpenAI => ProviderKind::Anthropic,
            ProviderKind::Anthropic => ProviderKind::OpenAI,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "gpt" => Ok(ProviderKind::OpenAI),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(LlmError::provider(other, "unknown provider")),
        }
    }
}

/// Settings for one configured provider
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub model: String,
    /// API key; never serialized
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            model: kind.default_model().to_string(),
            api_key: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Primary/secondary provider configuration for [`LlmClient`](super::LlmClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmClientConfig {
    pub primary: ProviderSettings,
    pub secondary: Option<ProviderSettings>,
    /// Fallback to the secondary happens only when the primary is this provider
    pub first_choice: ProviderKind,
}

impl LlmClientConfig {
    /// Primary provider with no fallback
    pub fn new(primary: ProviderSettings) -> Self {
        Self {
            first_choice: primary.kind,
            primary,
            secondary: None,
        }
    }

    pub fn with_secondary(mut self, secondary: ProviderSettings) -> Self {
        self.secondary = Some(secondary);
        self
    }

    pub fn with_first_choice(mut self, kind: ProviderKind) -> Self {
        self.first_choice = kind;
        self
    }
}
