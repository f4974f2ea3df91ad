use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use chatrelay_core::{ChatMessage, ChatModel, GenerationParams};

/// A deterministic `ChatModel` for tests.
///
/// Returns a canned reply (or a configured failure), serves scripted token
/// counts in order, and records the transcript of the last `generate` call.
pub struct MockModel {
    reply: String,
    fail_generate: bool,
    fail_count: bool,
    token_counts: Mutex<Vec<usize>>,
    last_prompt: Mutex<Vec<ChatMessage>>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            reply: "Mock reply".to_string(),
            fail_generate: false,
            fail_count: false,
            token_counts: Mutex::new(Vec::new()),
            last_prompt: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = reply.into();
        self
    }

    /// Make every `generate` call fail, as a timed-out service would.
    pub fn failing(mut self) -> Self {
        self.fail_generate = true;
        self
    }

    /// Make every `count_tokens` call fail, as an unreachable oracle would.
    pub fn with_failing_oracle(mut self) -> Self {
        self.fail_count = true;
        self
    }

    /// Script the counts returned by `count_tokens`, consumed front to
    /// back; the last value repeats once the script runs out.
    pub fn with_token_counts(self, counts: &[usize]) -> Self {
        *self.token_counts.lock().unwrap() = counts.to_vec();
        self
    }

    /// Transcript passed to the most recent `generate` call.
    pub fn last_prompt(&self) -> Vec<ChatMessage> {
        self.last_prompt.lock().unwrap().clone()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatModel for MockModel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        messages: &[ChatMessage],
        _params: &GenerationParams,
    ) -> Result<String> {
        *self.last_prompt.lock().unwrap() = messages.to_vec();
        if self.fail_generate {
            bail!("mock model failure");
        }
        Ok(self.reply.clone())
    }

    async fn count_tokens(&self, messages: &[ChatMessage]) -> Result<usize> {
        if self.fail_count {
            bail!("mock oracle failure");
        }
        let mut counts = self.token_counts.lock().unwrap();
        match counts.len() {
            // Unscripted: one token per message keeps trim loops finite.
            0 => Ok(messages.len()),
            1 => Ok(counts[0]),
            _ => Ok(counts.remove(0)),
        }
    }
}
