//! Strategy, solution, verification and explanation artifacts.

use serde::{Deserialize, Serialize};

use crate::problem::Topic;

/// Primary solution strategy chosen by the router.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum StrategyKind {
    SymbolicManipulation,
    NumericalComputation,
    StepByStepDerivation,
    ProbabilityAnalysis,
    MatrixOperations,
    /// Fallback: plain step-by-step manual solving
    #[default]
    Manual,
}

impl From<String> for StrategyKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "symbolic_manipulation" => StrategyKind::SymbolicManipulation,
            "numerical_computation" => StrategyKind::NumericalComputation,
            "step_by_step_derivation" => StrategyKind::StepByStepDerivation,
            "probability_analysis" => StrategyKind::ProbabilityAnalysis,
            "matrix_operations" => StrategyKind::MatrixOperations,
            _ => StrategyKind::Manual,
        }
    }
}

/// Tools the solver may lean on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", from = "String")]
pub enum ToolKind {
    SymbolicMath,
    Numeric,
    ScientificComputing,
    #[default]
    Manual,
}

impl From<String> for ToolKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "symbolic-math" => ToolKind::SymbolicMath,
            "numeric" => ToolKind::Numeric,
            "scientific-computing" => ToolKind::ScientificComputing,
            _ => ToolKind::Manual,
        }
    }
}

/// Routing decision for one parsed problem. Consumed only by the Solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default)]
    pub strategy: StrategyKind,

    #[serde(default)]
    pub tools: Vec<ToolKind>,

    /// Free-text justification of the chosen approach
    #[serde(default)]
    pub approach: String,

    #[serde(default)]
    pub confidence: f32,
}

impl Strategy {
    /// Schema-valid fallback used when routing output cannot be parsed.
    pub fn manual_fallback(approach: impl Into<String>) -> Self {
        Self {
            strategy: StrategyKind::Manual,
            tools: vec![ToolKind::Manual],
            approach: approach.into(),
            confidence: 0.5,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// A whitelisted symbolic-tool invocation requested by the solver model.
///
/// This is a function call against an enumerated capability table, never
/// arbitrary code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: String,

    #[serde(default)]
    pub args: Vec<String>,
}

/// The worked solution produced by the Solver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Solution {
    /// Ordered derivation steps
    #[serde(default)]
    pub steps: Vec<String>,

    #[serde(default)]
    pub final_answer: String,

    #[serde(default)]
    pub reasoning: String,

    #[serde(default)]
    pub confidence: f32,

    /// Symbolic-tool request, if the model asked for one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<ToolCall>,

    /// Dispatcher output for `tool_call`; errors are captured here as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<String>,
}

impl Solution {
    /// Schema-valid fallback used when solver output cannot be parsed.
    /// The raw response prefix is kept as reasoning for diagnosis.
    pub fn parse_failure(raw_response: &str) -> Self {
        Self {
            steps: vec!["Failed to parse solution steps".to_string()],
            final_answer: "Error in solving".to_string(),
            reasoning: truncate(raw_response, 500),
            confidence: 0.3,
            tool_call: None,
            tool_result: None,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// Verdict of the Verifier stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default)]
    pub is_correct: bool,

    #[serde(default)]
    pub confidence: f32,

    #[serde(default)]
    pub issues_found: Vec<String>,

    /// A human should review this result before it is trusted
    #[serde(default)]
    pub requires_hitl: bool,

    #[serde(default)]
    pub details: String,
}

impl Verification {
    /// Schema-valid fallback used when verifier output cannot be parsed.
    pub fn parse_failure(raw_response: &str) -> Self {
        Self {
            is_correct: false,
            confidence: 0.3,
            issues_found: vec!["Failed to parse verification results".to_string()],
            requires_hitl: true,
            details: truncate(raw_response, 500),
        }
    }

    pub fn normalized(mut self) -> Self {
        self.confidence = self.confidence.clamp(0.0, 1.0);
        self
    }
}

/// Student-facing explanation. Terminal artifact; never gates the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    #[serde(default)]
    pub explanation: String,

    #[serde(default)]
    pub key_concepts: Vec<String>,

    #[serde(default)]
    pub common_mistakes: Vec<String>,

    #[serde(default)]
    pub tips: Vec<String>,
}

impl Explanation {
    /// Best-effort fallback: the raw response (or solver reasoning) as the
    /// explanation body and the topic as the single key concept.
    pub fn fallback(body: &str, topic: Topic) -> Self {
        Self {
            explanation: truncate(body, 1000),
            key_concepts: vec![topic.as_str().to_string()],
            common_mistakes: vec![],
            tips: vec![],
        }
    }
}

/// One retrieved knowledge-base chunk.
///
/// Identity within the index is `(source, chunk index)`; the snippet
/// itself is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub content: String,

    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        match s.char_indices().nth(max_len) {
            Some((idx, _)) => s[..idx].to_string(),
            None => s.to_string(),
        }
    }
}
