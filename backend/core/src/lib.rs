//! chatrelay Core
//!
//! Shared types for the chat pipeline (messages, recorded turns, generation
//! parameters), the error taxonomy, and the capability trait over the hosted
//! chat-completion service.

pub mod error;
pub mod traits;
pub mod types;

pub use error::RelayError;
pub use traits::ChatModel;
pub use types::{ChatMessage, GenerationParams, Role, Turn};
