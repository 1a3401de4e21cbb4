//! LLM error types

use thiserror::Error;

/// Failure of a single chat-completions call.
///
/// Callers receive this instead of a content string so that a failed call can
/// never be mistaken for a list of measures or a report body.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API key not configured (set the {0} environment variable)")]
    MissingApiKey(String),

    #[error("Failed to send request to LLM provider: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed LLM response: {0}")]
    Malformed(String),
}

impl LlmError {
    /// Whether the provider was reached at all
    pub fn is_transport(&self) -> bool {
        matches!(self, LlmError::Transport(_))
    }
}
