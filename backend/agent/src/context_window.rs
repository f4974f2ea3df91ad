//! Working transcript with turn-count and token-budget enforcement.

use tracing::{debug, warn};

use chatrelay_core::{ChatMessage, ChatModel, Turn};

/// In-memory working transcript for the next model call, bounded by two
/// independent caps: a turn-count cap (`max_history` exchanges, so twice
/// that in messages) and a token budget measured by an external oracle.
///
/// Eviction is always oldest-first so the model sees the most recent
/// exchanges.
pub struct ContextWindow {
    messages: Vec<ChatMessage>,
    max_history: usize,
    max_context_tokens: usize,
}

impl ContextWindow {
    pub fn new(max_history: usize, max_context_tokens: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_history,
            max_context_tokens,
        }
    }

    /// Rebuild the transcript from turns reloaded out of the history store,
    /// two messages per turn, in file order.
    pub fn preload(&mut self, turns: &[Turn]) {
        self.messages.clear();
        for turn in turns {
            let [user, assistant] = turn.messages();
            self.messages.push(user);
            self.messages.push(assistant);
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::user(text));
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text));
    }

    /// The exact payload sent to the model.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Enforce the turn-count cap: a single truncation from the front down
    /// to at most `2 * max_history` messages, evicting whole exchanges so
    /// no orphaned assistant reply is left at the head of the transcript.
    ///
    /// An odd transcript length means a user message is pending an answer;
    /// that message always survives the trim, even with `max_history == 0`.
    pub fn trim_turns(&mut self) {
        let cap = self.max_history * 2;
        if self.messages.len() <= cap {
            return;
        }

        let mut evict = self.messages.len() - cap;
        if evict % 2 == 1 {
            evict += 1;
        }
        let pending = self.messages.len() % 2;
        let evict = evict.min(self.messages.len() - pending);

        if evict > 0 {
            debug!(evicted = evict, cap, "Trimming transcript to turn-count cap");
            self.messages.drain(..evict);
        }
    }

    /// Enforce the token budget: query the oracle with the current
    /// transcript and evict the oldest message until the reported count
    /// fits.
    ///
    /// An oracle failure fails open: the current size is accepted rather
    /// than blocking the user on telemetry. Terminates for every input.
    pub async fn trim_to_budget(&mut self, oracle: &dyn ChatModel) {
        loop {
            let count = match oracle.count_tokens(&self.messages).await {
                Ok(count) => count,
                Err(e) => {
                    warn!(error = %e, "Token oracle unavailable; accepting current transcript size");
                    return;
                }
            };

            if count <= self.max_context_tokens {
                return;
            }

            if self.messages.is_empty() {
                warn!(
                    tokens = count,
                    budget = self.max_context_tokens,
                    "Transcript empty but still over budget; giving up"
                );
                return;
            }

            debug!(
                tokens = count,
                budget = self.max_context_tokens,
                "Over token budget; evicting oldest message"
            );
            self.messages.remove(0);
        }
    }
}
