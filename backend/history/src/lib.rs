//! chatrelay History
//!
//! Durable, append-only JSON log of conversation turns. The log file is the
//! source of truth across restarts; the in-memory transcript is rebuilt from
//! it at startup.

pub mod store;

pub use store::HistoryStore;
