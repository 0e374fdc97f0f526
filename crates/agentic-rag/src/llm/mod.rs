//! LLM provider abstractions
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Stages (evaluate, generate)       │
//! └─────────────────┬───────────────────────┘
//!                   │ complete(prompt, system, max_tokens, temperature)
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │   LlmClient (primary → secondary once)  │
//! └─────────────────┬───────────────────────┘
//!                   │ LlmProvider (trait)
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │   RigProvider (wraps any Rig Agent<M>)  │
//! └─────────────────────────────────────────┘
//!          ┌────────┴────────┐
//!          ▼                 ▼
//! ┌─────────────────┐ ┌─────────────────┐
//! │   Rig OpenAI    │ │  Rig Anthropic  │
//! └─────────────────┘ └─────────────────┘
//! ```
//!
//! Every completion is normalized into [`Completion`] and priced from the
//! static table in [`pricing`].

mod client;
mod config;
pub mod pricing;
mod provider;
mod rig_adapter;

pub use client::LlmClient;
pub use config::{LlmClientConfig, ProviderKind, ProviderSettings, TokenUsage};
pub use pricing::{calculate_cost, pricing_for, ModelPricing};
pub use provider::{Completion, CompletionRequest, LlmProvider};
pub use rig_adapter::{build_provider, RigProvider};
