//! # Agentic RAG
//!
//! Answers questions from a local document corpus, researching the web when
//! the documents fall short, within a time and dollar budget.
//!
//! ## Quick Start
//! ```bash
//! CORPUS_PATH=docs.json cargo run -- "What changed in the 2024 pricing?"
//! cargo run -- --serve 127.0.0.1:8080
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

/// HTTP server (sync and SSE endpoints)
mod server;

/// Keyless web search fallback
mod tools;

// =============================================================================
// IMPORTS
// =============================================================================
use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use agentic_rag::{
    HybridSearcher, LlmClient, Orchestrator, ProviderKind, QueryResponse, TavilyClient, WebSearch,
};

use crate::config::{load_corpus, Config};
use crate::tools::DuckDuckGoSearch;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
/// # Rust Concept: Derive Macros with Clap
///
/// Flags override the matching environment variables loaded by
/// [`Config::from_env`].
#[derive(Parser, Debug)]
#[command(
    name = "agentic-rag",
    version,
    about = "Answer questions from your documents, researching the web when they fall short",
    long_about = r#"
Agentic RAG - budget-aware retrieval-augmented generation.

Each query runs a retrieve -> evaluate -> research -> generate loop:
  1. Search the internal corpus (hybrid search, reciprocal rank fusion)
  2. Ask an LLM whether the evidence answers the question
  3. If not, search the web for what is missing (bounded iterations)
  4. Generate a cited answer

ENVIRONMENT:
  OPENAI_API_KEY / ANTHROPIC_API_KEY   At least one is required
  TAVILY_API_KEY                       Web research (DuckDuckGo if unset)
  TAVILY_TOPIC                         general (default) or news
  CORPUS_PATH                          JSON array of documents

EXAMPLES:
  agentic-rag "How does our refund policy handle partial orders?"
  agentic-rag --stream --max-iterations 1 "Latest Tokio release?"
  agentic-rag --serve 0.0.0.0:8080
"#
)]
struct Args {
    /// The question to answer (omit with --serve)
    #[arg(value_name = "QUERY", required_unless_present = "serve")]
    query: Option<String>,

    /// Print the run as Server-Sent Events frames instead of a summary
    #[arg(short = 's', long = "stream", conflicts_with = "serve")]
    stream: bool,

    /// Serve the HTTP API on this address instead of answering one query
    #[arg(long = "serve", value_name = "ADDR")]
    serve: Option<SocketAddr>,

    /// Document corpus (overrides CORPUS_PATH)
    #[arg(short = 'c', long = "corpus", value_name = "FILE", env = "CORPUS_PATH")]
    corpus: Option<PathBuf>,

    /// Maximum web research iterations
    #[arg(long = "max-iterations")]
    max_iterations: Option<u32>,

    /// Wall-clock budget per query, in seconds
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,

    /// Dollar budget per query
    #[arg(long = "cost-ceiling")]
    cost_ceiling: Option<f64>,

    /// LLM provider to try first (openai or anthropic)
    #[arg(long = "primary")]
    primary: Option<ProviderKind>,

    /// Restrict internal retrieval to one session's documents
    #[arg(long = "session")]
    session: Option<String>,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the environment configuration
    fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.corpus {
            config.corpus_path = Some(path.clone());
        }
        if let Some(max_iterations) = self.max_iterations {
            config.agent.max_iterations = max_iterations;
        }
        if let Some(secs) = self.timeout_secs {
            config.agent.timeout = Duration::from_secs(secs);
        }
        if let Some(ceiling) = self.cost_ceiling {
            config.agent.cost_ceiling_usd = ceiling;
        }
        if let Some(primary) = self.primary {
            config.primary = primary;
        }
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    info!(
        primary = %config.primary,
        max_iterations = config.agent.max_iterations,
        timeout = ?config.agent.timeout,
        cost_ceiling_usd = config.agent.cost_ceiling_usd,
        "Configuration loaded"
    );

    let orchestrator = build_orchestrator(&config)?;

    if let Some(addr) = args.serve {
        return server::run(addr, orchestrator).await;
    }

    let query = args.query.context("A query is required")?;

    if args.stream {
        let mut events = orchestrator.stream(query, args.session);
        let mut stdout = std::io::stdout();
        while let Some(event) = events.next().await {
            stdout.write_all(event.to_sse_frame().as_bytes())?;
            stdout.flush()?;
        }
        return Ok(());
    }

    let response = orchestrator
        .run_with_session(&query, args.session.as_deref())
        .await;
    print_response(&response);

    match &response.error {
        Some(message) if response.final_answer.is_none() => {
            error!(error = %message, "Query failed");
            anyhow::bail!("Query failed: {}", message)
        }
        _ => Ok(()),
    }
}

/// Wire the LLM client, internal index and web search into an orchestrator
fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let llm = LlmClient::from_config(&config.llm_config()?)
        .context("Failed to create LLM client")?;

    let index = load_corpus(config.corpus_path.as_deref())?;
    info!(documents = index.len(), "Corpus loaded");
    let hybrid = HybridSearcher::over_index(&index).with_rrf_k(config.agent.rrf_k);

    let web: Arc<dyn WebSearch> = match &config.tavily_api_key {
        Some(key) => Arc::new(TavilyClient::new(key.clone()).with_topic(config.tavily_topic)),
        None => {
            info!("TAVILY_API_KEY not set, using DuckDuckGo for web research");
            Arc::new(DuckDuckGoSearch::new()?)
        }
    };

    Ok(Orchestrator::new(llm, Arc::new(hybrid), web).with_config(config.agent.clone()))
}

fn print_response(response: &QueryResponse) {
    println!("\n{}", "=".repeat(60));
    match &response.final_answer {
        Some(answer) => println!("{}", answer),
        None => println!("No answer generated."),
    }

    if !response.sources.is_empty() {
        println!("\nSOURCES");
        for (i, source) in response.sources.iter().enumerate() {
            let label = source
                .title
                .as_deref()
                .or(source.id.as_deref())
                .unwrap_or("untitled");
            match &source.url {
                Some(url) => println!("  {}. [{}] {} ({})", i + 1, source.source_type.as_str(), label, url),
                None => println!("  {}. [{}] {}", i + 1, source.source_type.as_str(), label),
            }
        }
    }

    println!(
        "\nresearch iterations: {} | cost: ${:.4} of ${:.2} | limit: {}",
        response.research_iterations,
        response.cost_spent_usd,
        response.cost_ceiling_usd,
        response.exceeded_limit.as_str(),
    );
    if let Some(error) = &response.error {
        println!("error: {}", error);
    }
    println!("{}", "=".repeat(60));
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects DEBUG over INFO.
/// Logs go to stderr so `--stream` output stays clean.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
