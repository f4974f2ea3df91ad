//! chatrelay Model
//!
//! `ChatModel` implementations: the real OpenAI-style HTTP client and a
//! deterministic mock for tests.

pub mod mock;
pub mod openai;

pub use mock::MockModel;
pub use openai::OpenAiModel;
