use serde::{Deserialize, Serialize};

/// Author of a message in the working transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single role-tagged message, the unit the model consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One recorded exchange. Immutable once written to the history log.
///
/// The Spanish field names are the on-disk contract of the log file and
/// must not change; entries with missing or unknown fields are rejected at
/// parse time rather than coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Turn {
    #[serde(rename = "usuario")]
    pub user_text: String,
    #[serde(rename = "respuesta")]
    pub response_text: String,
}

impl Turn {
    pub fn new(user_text: impl Into<String>, response_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            response_text: response_text.into(),
        }
    }

    /// Expand into the `[user, assistant]` message pair used when the
    /// working transcript is rebuilt from the log.
    pub fn messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage::user(self.user_text.clone()),
            ChatMessage::assistant(self.response_text.clone()),
        ]
    }
}

/// Generation parameters passed through to the model on every call.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Token allowance reserved for the generated reply
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Completions requested per call
    pub candidate_count: u32,
    pub presence_penalty: f32,
    pub frequency_penalty: f32,
    /// Optional stop sequences
    pub stop: Option<Vec<String>>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.6,
            top_p: 0.95,
            candidate_count: 1,
            presence_penalty: 0.5,
            frequency_penalty: 0.5,
            stop: None,
        }
    }
}
