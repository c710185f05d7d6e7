//! Verifier agent - checks correctness, domain validity and constraints.

use std::sync::Arc;
use std::time::Duration;

use mentor_common::{ParsedProblem, Solution, StageError, Verification};
use mentor_llm::LlmClient;
use tracing::{info, warn};

use crate::base::{AgentRuntime, JsonOutcome};

const VERIFIER_TEMPERATURE: f32 = 0.2;

const VERIFIER_SYSTEM_PROMPT: &str = r#"You are the verification stage of a JEE-level math mentor.
Your critical job is to verify solution correctness and identify any issues.

You must check:
1. Mathematical correctness (substitute the answer back into the problem)
2. Domain validity:
   - sqrt(x) requires x >= 0
   - log(x) requires x > 0
   - division requires denominator != 0
   - tan(x) undefined at x = pi/2 + n*pi
3. Constraint satisfaction (from the problem statement)
4. Common mistake patterns: sign errors, inequality reversals, domain
   violations, incorrect formula application
5. Logical consistency of the steps

Be STRICT and thorough. If unsure, flag for human review.

STRICT OUTPUT FORMAT (JSON only):
{
  "is_correct": true,
  "confidence": 0.95,
  "issues_found": [],
  "requires_hitl": false,
  "details": "detailed explanation of the verification"
}"#;

/// Verifies one [`Solution`].
///
/// Enforces the system invariant that any verdict below the configured
/// confidence threshold requires human review, regardless of what the
/// model itself reported.
pub struct VerifierAgent {
    runtime: AgentRuntime,
    confidence_threshold: f32,
}

impl VerifierAgent {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration, confidence_threshold: f32) -> Self {
        Self {
            runtime: AgentRuntime::new(client, timeout),
            confidence_threshold,
        }
    }

    pub async fn execute(
        &self,
        problem: &ParsedProblem,
        solution: &Solution,
    ) -> Result<Verification, StageError> {
        info!(
            answer = %solution.final_answer.chars().take(80).collect::<String>(),
            "Verifying solution"
        );

        let user_prompt = format!(
            "Verify this solution:\n\n\
             Problem: {}\n\
             Constraints: {:?}\n\n\
             Solution Steps:\n{}\n\n\
             Final Answer: {}\n\n\
             Perform a thorough verification. Return ONLY the JSON output.",
            problem.problem_text,
            problem.constraints,
            solution.steps.join("\n"),
            solution.final_answer
        );

        let outcome = self
            .runtime
            .request_json(
                "verifier",
                VERIFIER_SYSTEM_PROMPT,
                user_prompt,
                VERIFIER_TEMPERATURE,
            )
            .await?;

        let mut verification = match outcome {
            JsonOutcome::Value(value) => match serde_json::from_value::<Verification>(value) {
                Ok(verification) => verification.normalized(),
                Err(e) => {
                    warn!(error = %e, "Verifier output did not match schema");
                    Verification::parse_failure("")
                }
            },
            JsonOutcome::Unparseable(raw) => {
                warn!("Verifier returned non-JSON output");
                Verification::parse_failure(&raw)
            }
            JsonOutcome::TimedOut => Verification::parse_failure("Verification timed out"),
        };

        // Low confidence always escalates, whatever the model said.
        if verification.confidence < self.confidence_threshold {
            verification.requires_hitl = true;
        }

        Ok(verification)
    }
}
