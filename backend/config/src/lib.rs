//! chatrelay runtime configuration, loaded from environment variables.

use serde::Deserialize;

use chatrelay_core::GenerationParams;

/// chatrelay runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Model service API key
    pub openai_api_key: Option<String>,
    /// Chat completion model identifier
    pub model: String,
    /// Turn-count cap on the working transcript, counted in exchanges
    pub max_history: usize,
    /// Generation length cap per reply, in tokens
    pub max_token: u32,
    /// Maximum context length of the configured model, in tokens
    pub model_context_length: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    /// Completions requested per model call
    pub candidate_count: u32,
    /// Path of the persisted history log
    pub history_path: String,
    /// Timeout for each outbound model service call, in seconds
    pub request_timeout_secs: u64,
    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            openai_api_key: None,
            model: "gpt-3.5-turbo-0125".to_string(),
            max_history: 10,
            max_token: 150,
            model_context_length: 4096,
            temperature: 0.6,
            top_p: 0.95,
            presence_penalty: 0.5,
            frequency_penalty: 0.5,
            candidate_count: 1,
            history_path: "/tmp/historial.json".to_string(),
            request_timeout_secs: 120,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Self {
            bind_address: std::env::var("CHATRELAY_BIND").unwrap_or(defaults.bind_address),
            port: std::env::var("CHATRELAY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            model: std::env::var("CHATRELAY_MODEL").unwrap_or(defaults.model),
            max_history: std::env::var("CHATRELAY_MAX_HISTORY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_history),
            max_token: std::env::var("CHATRELAY_MAX_TOKEN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_token),
            model_context_length: std::env::var("CHATRELAY_CONTEXT_LENGTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.model_context_length),
            temperature: std::env::var("CHATRELAY_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.temperature),
            top_p: std::env::var("CHATRELAY_TOP_P")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.top_p),
            presence_penalty: std::env::var("CHATRELAY_PRESENCE_PENALTY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.presence_penalty),
            frequency_penalty: std::env::var("CHATRELAY_FREQUENCY_PENALTY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.frequency_penalty),
            candidate_count: std::env::var("CHATRELAY_CANDIDATES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.candidate_count),
            history_path: std::env::var("CHATRELAY_HISTORY_PATH").unwrap_or(defaults.history_path),
            request_timeout_secs: std::env::var("CHATRELAY_REQUEST_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
        }
    }

    /// Token budget for the working transcript: the model's context length
    /// minus the allowance reserved for the generated reply.
    pub fn context_budget(&self) -> usize {
        self.model_context_length
            .saturating_sub(self.max_token as usize)
    }

    /// Generation parameters forwarded to the model on every call.
    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_token,
            temperature: self.temperature,
            top_p: self.top_p,
            candidate_count: self.candidate_count,
            presence_penalty: self.presence_penalty,
            frequency_penalty: self.frequency_penalty,
            stop: None,
        }
    }
}
