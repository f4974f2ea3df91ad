//! chatrelay Agent
//!
//! The per-request chat pipeline: a working transcript bounded by a
//! turn-count cap and a token budget, and the session object that runs one
//! full turn against the model (trim, generate, persist).

pub mod context_window;
pub mod session;

pub use context_window::ContextWindow;
pub use session::{ChatSession, FALLBACK_REPLY};
