//! chatrelay Gateway
//!
//! The HTTP surface: one conversational endpoint (`POST /chat`), a health
//! check, and permissive CORS. Request validation lives here; everything
//! behind it is the chat session pipeline.

pub mod chat_api;
pub mod server;

pub use server::{build_router, start_server, GatewayState};
