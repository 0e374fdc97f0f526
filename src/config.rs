//! # Configuration Module
//!
//! Loads provider credentials, budgets and the corpus location from the
//! environment (and a `.env` file), then turns them into the library's
//! [`AgentConfig`] and [`LlmClientConfig`].

use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use agentic_rag::llm::{LlmClientConfig, ProviderSettings};
use agentic_rag::{AgentConfig, MemoryIndex, ProviderKind, Topic};

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Runtime configuration for the CLI and server
#[derive(Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,

    /// Without a key, web research falls back to DuckDuckGo
    pub tavily_api_key: Option<String>,

    /// Tavily topic filter for web research
    pub tavily_topic: Topic,

    /// Provider tried first; the other one is the fallback
    pub primary: ProviderKind,

    pub openai_model: String,
    pub anthropic_model: String,

    /// Loop budgets and bounds
    pub agent: AgentConfig,

    /// JSON array of documents for the internal index
    pub corpus_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            anthropic_api_key: None,
            tavily_api_key: None,
            tavily_topic: Topic::General,
            primary: ProviderKind::OpenAI,
            openai_model: ProviderKind::OpenAI.default_model().to_string(),
            anthropic_model: ProviderKind::Anthropic.default_model().to_string(),
            agent: AgentConfig::default(),
            corpus_path: None,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "***"))
            .field("anthropic_api_key", &self.anthropic_api_key.as_ref().map(|_| "***"))
            .field("tavily_api_key", &self.tavily_api_key.as_ref().map(|_| "***"))
            .field("tavily_topic", &self.tavily_topic)
            .field("primary", &self.primary)
            .field("openai_model", &self.openai_model)
            .field("anthropic_model", &self.anthropic_model)
            .field("agent", &self.agent)
            .field("corpus_path", &self.corpus_path)
            .finish()
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from `.env` and environment variables.
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (silently ignore if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key/value source
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        config.openai_api_key = get("OPENAI_API_KEY");
        config.anthropic_api_key = get("ANTHROPIC_API_KEY");
        config.tavily_api_key = get("TAVILY_API_KEY");

        if let Some(val) = get("TAVILY_TOPIC") {
            config.tavily_topic = match val.trim().to_lowercase().as_str() {
                "general" => Topic::General,
                "news" => Topic::News,
                other => anyhow::bail!("TAVILY_TOPIC must be 'general' or 'news', got '{}'", other),
            };
        }

        if let Some(val) = get("LLM_PRIMARY") {
            config.primary = val
                .parse()
                .context("LLM_PRIMARY must be 'openai' or 'anthropic'")?;
        }

        if let Some(val) = get("OPENAI_MODEL") {
            config.openai_model = val;
        }

        if let Some(val) = get("ANTHROPIC_MODEL") {
            config.anthropic_model = val;
        }

        if let Some(val) = get("AGENT_MAX_ITERATIONS") {
            config.agent.max_iterations = val
                .parse()
                .context("AGENT_MAX_ITERATIONS must be a non-negative integer")?;
        }

        if let Some(val) = get("AGENT_TIMEOUT_SECS") {
            let secs: f64 = val
                .parse()
                .context("AGENT_TIMEOUT_SECS must be a number of seconds (e.g., 60)")?;
            config.agent.timeout = Duration::try_from_secs_f64(secs)
                .context("AGENT_TIMEOUT_SECS must be a non-negative number of seconds")?;
        }

        if let Some(val) = get("AGENT_COST_CEILING_USD") {
            config.agent.cost_ceiling_usd = val
                .parse()
                .context("AGENT_COST_CEILING_USD must be a dollar amount (e.g., 0.50)")?;
        }

        config.corpus_path = get("CORPUS_PATH").map(PathBuf::from);

        Ok(config)
    }

    fn api_key(&self, kind: ProviderKind) -> Option<&String> {
        match kind {
            ProviderKind::OpenAI => self.openai_api_key.as_ref(),
            ProviderKind::Anthropic => self.anthropic_api_key.as_ref(),
        }
    }

    fn model(&self, kind: ProviderKind) -> &str {
        match kind {
            ProviderKind::OpenAI => &self.openai_model,
            ProviderKind::Anthropic => &self.anthropic_model,
        }
    }

    fn provider_settings(&self, kind: ProviderKind) -> Option<ProviderSettings> {
        self.api_key(kind).map(|key| {
            ProviderSettings::new(kind)
                .with_model(self.model(kind))
                .with_api_key(key.clone())
        })
    }

    /// Provider setup for the LLM client
    ///
    /// The configured primary is the first choice. If it has no key, its
    /// counterpart becomes the sole provider.
    pub fn llm_config(&self) -> Result<LlmClientConfig> {
        let secondary_kind = self.primary.counterpart();

        match (
            self.provider_settings(self.primary),
            self.provider_settings(secondary_kind),
        ) {
            (Some(primary), Some(secondary)) => Ok(LlmClientConfig::new(primary)
                .with_secondary(secondary)
                .with_first_choice(self.primary)),
            (Some(primary), None) => Ok(LlmClientConfig::new(primary)),
            (None, Some(secondary)) => {
                warn!(
                    primary = %self.primary,
                    using = %secondary_kind,
                    "No API key for the primary provider"
                );
                Ok(LlmClientConfig::new(secondary))
            }
            (None, None) => anyhow::bail!(
                "No LLM API key configured: set OPENAI_API_KEY or ANTHROPIC_API_KEY"
            ),
        }
    }

    /// Validate the configuration.
    ///
    /// Fails fast with a clear error instead of failing mid-query.
    pub fn validate(&self) -> Result<()> {
        self.agent
            .validate()
            .context("Invalid agent configuration")?;

        if self.openai_model.trim().is_empty() || self.anthropic_model.trim().is_empty() {
            anyhow::bail!("Model names cannot be empty");
        }

        self.llm_config()?;

        if let Some(path) = &self.corpus_path {
            if !path.is_file() {
                anyhow::bail!("CORPUS_PATH does not point to a file: {}", path.display());
            }
        }

        Ok(())
    }
}

/// Load the internal document index, or an empty one when no corpus is set
pub fn load_corpus(path: Option<&Path>) -> Result<MemoryIndex> {
    let Some(path) = path else {
        warn!("No corpus configured, internal search will return nothing");
        return Ok(MemoryIndex::new(Vec::new()));
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus {}", path.display()))?;

    MemoryIndex::from_json(&json)
        .with_context(|| format!("Failed to parse corpus {}", path.display()))
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.primary, ProviderKind::OpenAI);
        assert_eq!(config.tavily_topic, Topic::General);
        assert_eq!(config.openai_model, "gpt-4o-mini");
        assert_eq!(config.agent.max_iterations, 2);
        assert!(config.corpus_path.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("TAVILY_TOPIC", "News"),
            ("LLM_PRIMARY", "claude"),
            ("ANTHROPIC_MODEL", "claude-3-5-sonnet-latest"),
            ("AGENT_MAX_ITERATIONS", "4"),
            ("AGENT_TIMEOUT_SECS", "12.5"),
            ("AGENT_COST_CEILING_USD", "0.25"),
            ("CORPUS_PATH", "/tmp/corpus.json"),
        ])
        .unwrap();

        assert_eq!(config.tavily_topic, Topic::News);
        assert_eq!(config.primary, ProviderKind::Anthropic);
        assert_eq!(config.anthropic_model, "claude-3-5-sonnet-latest");
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.timeout, Duration::from_millis(12_500));
        assert_eq!(config.agent.cost_ceiling_usd, 0.25);
        assert_eq!(config.corpus_path, Some(PathBuf::from("/tmp/corpus.json")));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(config_from(&[("AGENT_MAX_ITERATIONS", "two")]).is_err());
        assert!(config_from(&[("AGENT_TIMEOUT_SECS", "-1")]).is_err());
        assert!(config_from(&[("LLM_PRIMARY", "ollama")]).is_err());
        assert!(config_from(&[("TAVILY_TOPIC", "finance")]).is_err());
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = config_from(&[("OPENAI_API_KEY", "  "), ("TAVILY_API_KEY", "")]).unwrap();
        assert!(config.openai_api_key.is_none());
        assert!(config.tavily_api_key.is_none());
    }

    #[test]
    fn test_llm_config_with_fallback() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-oai"), ("ANTHROPIC_API_KEY", "sk-ant")]).unwrap();
        let llm = config.llm_config().unwrap();

        assert_eq!(llm.primary.kind, ProviderKind::OpenAI);
        assert_eq!(llm.secondary.as_ref().map(|s| s.kind), Some(ProviderKind::Anthropic));
        assert_eq!(llm.first_choice, ProviderKind::OpenAI);
    }

    #[test]
    fn test_llm_config_promotes_counterpart() {
        let config = config_from(&[("ANTHROPIC_API_KEY", "sk-ant")]).unwrap();
        let llm = config.llm_config().unwrap();

        assert_eq!(llm.primary.kind, ProviderKind::Anthropic);
        assert!(llm.secondary.is_none());
    }

    #[test]
    fn test_validation_requires_a_provider() {
        assert!(Config::default().validate().is_err());

        let config = config_from(&[("OPENAI_API_KEY", "sk-oai")]).unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_missing_corpus() {
        let config = config_from(&[
            ("OPENAI_API_KEY", "sk-oai"),
            ("CORPUS_PATH", "/definitely/not/here.json"),
        ])
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_masks_keys() {
        let config = config_from(&[("OPENAI_API_KEY", "sk-secret")]).unwrap();
        assert!(!format!("{:?}", config).contains("sk-secret"));
    }

    #[test]
    fn test_load_corpus() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": "a", "title": "Alpha", "content": "alpha text"}}, {{"id": "b", "content": "beta text"}}]"#
        )
        .unwrap();

        let index = load_corpus(Some(file.path())).unwrap();
        assert_eq!(index.len(), 2);

        assert!(load_corpus(None).unwrap().is_empty());
    }

    #[test]
    fn test_load_corpus_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(load_corpus(Some(file.path())).is_err());
        assert!(load_corpus(Some(Path::new("/definitely/not/here.json"))).is_err());
    }
}
