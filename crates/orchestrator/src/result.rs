//! Terminal results of one solve call.

use mentor_common::{
    Explanation, ParsedProblem, Solution, Strategy, TraceEntry, Verification,
};
use serde::{Deserialize, Serialize};

/// A retrieved source surfaced to the caller: name plus a short preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSource {
    pub source: String,
    pub content: String,
}

/// A similar past problem surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarSummary {
    pub interaction_id: String,
    pub problem_text: String,
    pub final_answer: String,
    pub score: usize,
}

/// The caller always receives exactly one of these variants; raw errors
/// never cross the orchestrator boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolveResult {
    Success {
        interaction_id: String,
        parsed_problem: ParsedProblem,
        strategy: Strategy,
        solution: Solution,
        verification: Verification,
        explanation: Explanation,
        rag_sources: Vec<RagSource>,
        similar_problems: Vec<SimilarSummary>,
        execution_trace: Vec<TraceEntry>,
        /// Exactly the Verifier's (possibly overridden) flag
        requires_hitl: bool,
        /// Soft signal carried through from Parsing
        needs_clarification: bool,
    },

    QuotaExceeded {
        message: String,
        execution_trace: Vec<TraceEntry>,
    },

    Error {
        message: String,
        execution_trace: Vec<TraceEntry>,
    },
}

impl SolveResult {
    pub fn execution_trace(&self) -> &[TraceEntry] {
        match self {
            SolveResult::Success {
                execution_trace, ..
            }
            | SolveResult::QuotaExceeded {
                execution_trace, ..
            }
            | SolveResult::Error {
                execution_trace, ..
            } => execution_trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tag_serializes_snake_case() {
        let result = SolveResult::QuotaExceeded {
            message: "slow down".into(),
            execution_trace: vec![],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "quota_exceeded");
        assert_eq!(json["message"], "slow down");
    }
}
