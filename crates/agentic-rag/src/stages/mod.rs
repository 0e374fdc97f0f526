//! The four pipeline stages
//!
//! Each stage reads the current [`AgentState`](crate::state::AgentState) and
//! returns a [`StateUpdate`](crate::state::StateUpdate). Only retrieval can
//! fail; the others absorb collaborator errors into their update.

mod evaluate;
mod generate;
mod research;
mod retrieve;

pub use evaluate::{evaluate, parse_evaluation};
pub use generate::generate;
pub use research::{refine_query, research};
pub use retrieve::retrieve;

/// Scripted provider shared by the stage tests
#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::error::LlmError;
    use crate::llm::{
        Completion, CompletionRequest, LlmClient, LlmProvider, ProviderKind, TokenUsage,
    };

    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request.clone());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::NoProvider))?;
            Ok(Completion::new(reply, ProviderKind::OpenAI, "gpt-4o-mini")
                .with_usage(TokenUsage::new(1_000, 500)))
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAI
        }

        fn model(&self) -> &str {
            "gpt-4o-mini"
        }
    }

    pub fn client(provider: &Arc<ScriptedProvider>) -> LlmClient {
        LlmClient::new(provider.clone())
    }
}
