use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ChatMessage, GenerationParams};

/// Capability interface over the hosted chat-completion service.
///
/// `generate` is the model call proper; `count_tokens` is the token-counting
/// oracle the context window consults while trimming. Tests substitute
/// deterministic implementations for both.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Generate one reply for the given transcript.
    async fn generate(
        &self,
        messages: &[ChatMessage],
        params: &GenerationParams,
    ) -> Result<String>;

    /// Report how many tokens the given transcript occupies.
    async fn count_tokens(&self, messages: &[ChatMessage]) -> Result<usize>;
}
