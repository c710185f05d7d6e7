//! The structured problem representation produced by the Parser stage.

use serde::{Deserialize, Serialize};

/// Supported problem domains.
///
/// Anything the parser cannot positively identify lands in `Unknown`
/// rather than a guess.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Topic {
    Algebra,
    Calculus,
    Probability,
    LinearAlgebra,
    #[default]
    Unknown,
}

impl From<String> for Topic {
    fn from(s: String) -> Self {
        match s.as_str() {
            "algebra" => Topic::Algebra,
            "calculus" => Topic::Calculus,
            "probability" => Topic::Probability,
            "linear_algebra" => Topic::LinearAlgebra,
            _ => Topic::Unknown,
        }
    }
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Algebra => "algebra",
            Topic::Calculus => "calculus",
            Topic::Probability => "probability",
            Topic::LinearAlgebra => "linear_algebra",
            Topic::Unknown => "unknown",
        }
    }
}

/// A raw problem statement structured by the Parser agent.
///
/// Produced once per solve call and immutable afterwards; every later
/// stage consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedProblem {
    /// Cleaned problem statement
    #[serde(default)]
    pub problem_text: String,

    #[serde(default)]
    pub topic: Topic,

    #[serde(default)]
    pub variables: Vec<String>,

    #[serde(default)]
    pub constraints: Vec<String>,

    #[serde(default)]
    pub equations: Vec<String>,

    /// Soft signal: the input looked ambiguous or incomplete
    #[serde(default)]
    pub needs_clarification: bool,

    #[serde(default)]
    pub confidence: f32,

    #[serde(default)]
    pub reasoning: String,
}

impl ParsedProblem {
    /// Schema-valid fallback used when the model output cannot be parsed.
    pub fn parse_failure(raw_text: &str, reasoning: impl Into<String>) -> Self {
        Self {
            problem_text: raw_text.to_string(),
            topic: Topic::Unknown,
            variables: vec![],
            constraints: vec![],
            equations: vec![],
            needs_clarification: true,
            confidence: 0.3,
            reasoning: reasoning.into(),
        }
    }

    /// Clamp the reported confidence into [0, 1].
    pub fn normalized(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Topic::LinearAlgebra).unwrap(),
            "\"linear_algebra\""
        );
        assert_eq!(serde_json::to_string(&Topic::Algebra).unwrap(), "\"algebra\"");
    }

    #[test]
    fn unrecognized_topic_becomes_unknown() {
        let topic: Topic = serde_json::from_str("\"number_theory\"").unwrap();
        assert_eq!(topic, Topic::Unknown);
    }

    #[test]
    fn partial_json_still_deserializes() {
        let parsed: ParsedProblem =
            serde_json::from_str(r#"{"problem_text": "solve x", "topic": "algebra"}"#).unwrap();
        assert_eq!(parsed.topic, Topic::Algebra);
        assert!(parsed.equations.is_empty());
        assert!(!parsed.needs_clarification);
        assert_eq!(parsed.confidence, 0.0);
    }

    #[test]
    fn parse_failure_is_schema_valid() {
        let fallback = ParsedProblem::parse_failure("2 + 2", "model returned prose");
        assert_eq!(fallback.problem_text, "2 + 2");
        assert_eq!(fallback.topic, Topic::Unknown);
        assert!(fallback.needs_clarification);
        assert!((fallback.confidence - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn normalized_clamps_confidence() {
        let parsed: ParsedProblem = serde_json::from_str(r#"{"confidence": 42.0}"#).unwrap();
        assert_eq!(parsed.normalized().confidence, 1.0);
    }
}
