use thiserror::Error;

/// Top-level error type for the chatrelay runtime.
///
/// None of these variants is fatal to the process; every failure in the
/// chat pipeline is recovered locally (fallback reply, empty history,
/// fail-open trimming) and the variant only records what went wrong.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("model service error: {message}")]
    Model { message: String },

    #[error("token count failed: {0}")]
    TokenCount(String),

    #[error("history store error: {0}")]
    History(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
