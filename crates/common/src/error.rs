//! Error types for Math Mentor.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MentorError {
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Memory error: {0}")]
    Memory(String),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MentorError>;

/// A transport-level failure during a pipeline stage.
///
/// This is the only kind of agent failure that propagates to the
/// orchestrator; malformed model output is absorbed into schema-valid
/// defaults at the agent boundary. The orchestrator needs exactly one
/// distinction: quota exhaustion (show wait guidance, caller may retry
/// later) versus everything else (degrade now).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error("LLM quota exhausted: {0}")]
    QuotaExhausted(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),
}

impl StageError {
    /// Classify a raw transport error message.
    ///
    /// HTTP 429 and provider "quota"/"rate limit" markers map to
    /// [`StageError::QuotaExhausted`]; everything else is upstream.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        if lower.contains("429") || lower.contains("quota") || lower.contains("rate limit") {
            StageError::QuotaExhausted(message)
        } else {
            StageError::Upstream(message)
        }
    }

    pub fn is_quota(&self) -> bool {
        matches!(self, StageError::QuotaExhausted(_))
    }
}
