//! Durable interaction and feedback records.

use serde::{Deserialize, Serialize};

use crate::problem::ParsedProblem;
use crate::solution::{Explanation, KnowledgeSnippet, Solution, Verification};

/// Origin of a solve input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Image,
    Audio,
    Text,
}

impl InputKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputKind::Image => "image",
            InputKind::Audio => "audio",
            InputKind::Text => "text",
        }
    }
}

/// Which learned-correction map applies to a piece of recognized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionKind {
    Ocr,
    Asr,
}

/// The complete durable record of one solve call.
///
/// Created exactly once per completed solve, appended to an ordered log,
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Deterministic id derived from `(timestamp, raw_input)`
    pub interaction_id: String,

    /// RFC 3339 creation time
    pub timestamp: String,

    pub raw_input: String,

    pub input_type: InputKind,

    pub parsed_problem: ParsedProblem,

    #[serde(default)]
    pub retrieved_context: Vec<KnowledgeSnippet>,

    pub solution: Solution,

    pub verification: Verification,

    pub explanation: Explanation,

    /// Ids of similar past interactions found at solve time
    #[serde(default)]
    pub similar_problem_ids: Vec<String>,
}

/// Feedback payload submitted by a user for one interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFeedback {
    pub approved: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// One appended feedback-log entry.
///
/// Deliberately never joined back into the interaction log; feedback for
/// an id that never existed is still recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub interaction_id: String,

    pub timestamp: String,

    #[serde(flatten)]
    pub feedback: UserFeedback,
}
