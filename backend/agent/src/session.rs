//! One-conversation chat pipeline.

use std::sync::Arc;

use tracing::{error, info};

use chatrelay_core::{ChatModel, GenerationParams, RelayError, Turn};
use chatrelay_history::HistoryStore;

use crate::context_window::ContextWindow;

/// Reply substituted when the model call fails, so the user always receives
/// an answer. Recorded in the history log like any other reply.
pub const FALLBACK_REPLY: &str = "Lo siento, no pude entender eso.";

/// The explicit context object for one conversation: working transcript,
/// durable log, and the model it talks to.
///
/// Callers must serialize access to a session (the gateway holds it behind
/// a mutex); interleaved turns would corrupt transcript ordering and lose
/// appends.
pub struct ChatSession {
    window: ContextWindow,
    store: HistoryStore,
    model: Arc<dyn ChatModel>,
    params: GenerationParams,
}

impl ChatSession {
    pub fn new(
        window: ContextWindow,
        store: HistoryStore,
        model: Arc<dyn ChatModel>,
        params: GenerationParams,
    ) -> Self {
        Self {
            window,
            store,
            model,
            params,
        }
    }

    /// Rebuild the working transcript from the durable log, then apply the
    /// turn-count cap so an oversized log cannot overflow the first request.
    pub async fn preload_history(&mut self) {
        let turns = self.store.load().await;
        info!(turns = turns.len(), path = %self.store.path().display(), "Loaded conversation history");
        self.window.preload(&turns);
        self.window.trim_turns();
    }

    /// Run one full chat turn.
    ///
    /// Pipeline: append the user message, trim by turn count, trim by token
    /// budget, call the model (substituting the fallback reply on failure),
    /// append the reply, persist the turn. A persistence failure is logged
    /// but never aborts the turn; the reply the user saw stays in the
    /// working transcript.
    pub async fn handle_message(&mut self, text: &str) -> Result<String, RelayError> {
        if text.is_empty() {
            return Err(RelayError::InvalidRequest(
                "Message text is empty".to_string(),
            ));
        }

        self.window.push_user(text);
        self.window.trim_turns();
        self.window.trim_to_budget(self.model.as_ref()).await;

        let reply = match self
            .model
            .generate(self.window.messages(), &self.params)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                error!(
                    model = self.model.name(),
                    error = %format!("{e:#}"),
                    "Model call failed; substituting fallback reply"
                );
                FALLBACK_REPLY.to_string()
            }
        };

        self.window.push_assistant(reply.clone());

        if let Err(e) = self.store.append(Turn::new(text, reply.clone())).await {
            error!(path = %self.store.path().display(), error = %e, "Failed to persist turn");
        }

        Ok(reply)
    }

    /// Read access to the working transcript, mainly for tests and
    /// diagnostics.
    pub fn window(&self) -> &ContextWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatrelay_core::ChatMessage;
    use chatrelay_model::MockModel;
    use tempfile::tempdir;

    fn session_with(
        dir: &tempfile::TempDir,
        model: Arc<MockModel>,
        max_history: usize,
    ) -> ChatSession {
        let store = HistoryStore::new(dir.path().join("historial.json"));
        let window = ContextWindow::new(max_history, 4096 - 150);
        ChatSession::new(window, store, model, GenerationParams::default())
    }

    #[tokio::test]
    async fn test_turn_is_answered_and_persisted() {
        let dir = tempdir().unwrap();
        let model = Arc::new(MockModel::new().with_reply("hi"));
        let mut session = session_with(&dir, model, 10);
        session.preload_history().await;

        let reply = session.handle_message("hello").await.unwrap();
        assert_eq!(reply, "hi");

        let turns = HistoryStore::new(dir.path().join("historial.json"))
            .load()
            .await;
        assert_eq!(turns, vec![Turn::new("hello", "hi")]);

        // Transcript now holds the full exchange.
        assert_eq!(
            session.window().messages(),
            &[ChatMessage::user("hello"), ChatMessage::assistant("hi")]
        );
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_before_touching_history() {
        let dir = tempdir().unwrap();
        let model = Arc::new(MockModel::new());
        let mut session = session_with(&dir, model, 10);

        let err = session.handle_message("").await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidRequest(_)));
        assert!(session.window().is_empty());
        assert!(!dir.path().join("historial.json").exists());
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_and_still_persists() {
        let dir = tempdir().unwrap();
        let model = Arc::new(MockModel::new().failing());
        let mut session = session_with(&dir, model, 10);

        let reply = session.handle_message("hello").await.unwrap();
        assert_eq!(reply, FALLBACK_REPLY);

        // The log records what the user actually saw.
        let turns = HistoryStore::new(dir.path().join("historial.json"))
            .load()
            .await;
        assert_eq!(turns, vec![Turn::new("hello", FALLBACK_REPLY)]);
    }

    #[tokio::test]
    async fn test_persistence_failure_keeps_turn_in_transcript() {
        let dir = tempdir().unwrap();
        let model = Arc::new(MockModel::new().with_reply("hi"));

        // A directory at the log path makes every write fail.
        let log_dir = dir.path().join("historial.json");
        std::fs::create_dir(&log_dir).unwrap();

        let store = HistoryStore::new(&log_dir);
        let window = ContextWindow::new(10, 4096 - 150);
        let mut session =
            ChatSession::new(window, store, model, GenerationParams::default());

        let reply = session.handle_message("hello").await.unwrap();
        assert_eq!(reply, "hi");
        assert_eq!(session.window().len(), 2);
    }

    #[tokio::test]
    async fn test_max_history_one_evicts_first_exchange() {
        let dir = tempdir().unwrap();
        let model = Arc::new(MockModel::new().with_reply("ok"));
        let mut session = session_with(&dir, model.clone(), 1);

        session.handle_message("first").await.unwrap();
        session.handle_message("second").await.unwrap();

        // The second model call saw only the second user message; the first
        // exchange had been evicted by the turn-count cap.
        assert_eq!(model.last_prompt(), vec![ChatMessage::user("second")]);

        // The durable log still holds every turn.
        let turns = HistoryStore::new(dir.path().join("historial.json"))
            .load()
            .await;
        assert_eq!(turns.len(), 2);
    }

    #[tokio::test]
    async fn test_reload_after_restart_is_bounded() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("historial.json");

        let store = HistoryStore::new(&path);
        for i in 0..7 {
            store
                .append(Turn::new(format!("q{i}"), format!("a{i}")))
                .await
                .unwrap();
        }

        let model = Arc::new(MockModel::new());
        let mut session = session_with(&dir, model, 3);
        session.preload_history().await;

        // Only the most recent 3 exchanges survive the reload trim.
        assert_eq!(session.window().len(), 6);
        assert_eq!(session.window().messages()[0], ChatMessage::user("q4"));
    }

    #[tokio::test]
    async fn test_max_history_zero_still_answers() {
        let dir = tempdir().unwrap();
        let model = Arc::new(MockModel::new().with_reply("ok"));
        let mut session = session_with(&dir, model.clone(), 0);

        let reply = session.handle_message("hello").await.unwrap();
        assert_eq!(reply, "ok");
        assert_eq!(model.last_prompt(), vec![ChatMessage::user("hello")]);
    }
}
