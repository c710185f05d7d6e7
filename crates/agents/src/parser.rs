//! Parser agent - structures raw problem text.

use std::sync::Arc;
use std::time::Duration;

use mentor_common::{InputKind, ParsedProblem, StageError};
use mentor_llm::LlmClient;
use tracing::{info, warn};

use crate::base::{AgentRuntime, JsonOutcome};

const PARSER_TEMPERATURE: f32 = 0.3;

const PARSER_SYSTEM_PROMPT: &str = r#"You are the parsing stage of a JEE-level math mentor system.
Your job is to analyze raw mathematical problem text and structure it into a standard format.

You must:
1. Clean OCR/ASR noise
2. Standardize mathematical notation
3. Identify the topic (algebra, calculus, probability, or linear_algebra)
4. Extract variables, constraints, and equations
5. Detect if the problem is ambiguous or needs clarification

STRICT OUTPUT FORMAT (JSON only):
{
  "problem_text": "cleaned problem statement",
  "topic": "algebra|calculus|probability|linear_algebra",
  "variables": ["x", "y"],
  "constraints": ["x > 0", "x is real"],
  "equations": ["x^2 + 5x + 6 = 0"],
  "needs_clarification": false,
  "confidence": 0.95,
  "reasoning": "brief explanation of parsing decisions"
}

If the problem is unclear, incomplete, or contradictory, set needs_clarification to true
rather than guessing. If the topic is outside the four supported domains, use "unknown"."#;

/// Turns raw input into a [`ParsedProblem`]. First pipeline stage.
pub struct ParserAgent {
    runtime: AgentRuntime,
}

impl ParserAgent {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            runtime: AgentRuntime::new(client, timeout),
        }
    }

    pub async fn execute(
        &self,
        raw_text: &str,
        input_kind: InputKind,
    ) -> Result<ParsedProblem, StageError> {
        info!(
            input_kind = input_kind.as_str(),
            preview = %raw_text.chars().take(80).collect::<String>(),
            "Parsing problem"
        );

        let user_prompt = format!(
            "Parse this mathematical problem:\n\n\
             Raw Input: {raw_text}\n\
             Input Type: {}\n\n\
             Return ONLY the JSON output, no additional text.",
            input_kind.as_str()
        );

        let outcome = self
            .runtime
            .request_json("parser", PARSER_SYSTEM_PROMPT, user_prompt, PARSER_TEMPERATURE)
            .await?;

        let parsed = match outcome {
            JsonOutcome::Value(value) => match serde_json::from_value::<ParsedProblem>(value) {
                Ok(parsed) => parsed.normalized(),
                Err(e) => {
                    warn!(error = %e, "Parser output did not match schema");
                    ParsedProblem::parse_failure(raw_text, "Failed to parse problem structure")
                }
            },
            JsonOutcome::Unparseable(_) => {
                warn!("Parser returned non-JSON output");
                ParsedProblem::parse_failure(raw_text, "Failed to parse problem structure")
            }
            JsonOutcome::TimedOut => {
                ParsedProblem::parse_failure(raw_text, "Parsing timed out")
            }
        };

        Ok(parsed)
    }
}
