//! Explainer agent - student-friendly walkthrough of the solution.

use std::sync::Arc;
use std::time::Duration;

use mentor_common::{Explanation, ParsedProblem, Solution, StageError, Verification};
use mentor_llm::LlmClient;
use tracing::{info, warn};

use crate::base::{AgentRuntime, JsonOutcome};

const EXPLAINER_TEMPERATURE: f32 = 0.5;

const EXPLAINER_SYSTEM_PROMPT: &str = r#"You are the tutoring stage of a JEE-level math mentor.
Your job is to create clear, student-friendly explanations that help students understand the solution.

You must:
1. Explain WHY each step is taken, not just WHAT
2. Highlight key concepts used
3. Point out common mistakes to avoid
4. Provide helpful tips and intuition
5. Use simple, encouraging language
6. Connect to known formulas and theorems

Your explanation should help a student learn, not just copy the answer.

STRICT OUTPUT FORMAT (JSON only):
{
  "explanation": "detailed step-by-step explanation in friendly language",
  "key_concepts": ["concept1", "concept2"],
  "common_mistakes": ["mistake1 to avoid", "mistake2 to avoid"],
  "tips": ["helpful tip 1", "helpful tip 2"]
}"#;

/// Terminal stage. Parse failures degrade to a best-effort explanation
/// here; transport failures are degraded by the orchestrator, so this
/// stage can never abort a solve.
pub struct ExplainerAgent {
    runtime: AgentRuntime,
}

impl ExplainerAgent {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            runtime: AgentRuntime::new(client, timeout),
        }
    }

    pub async fn execute(
        &self,
        problem: &ParsedProblem,
        solution: &Solution,
        verification: &Verification,
    ) -> Result<Explanation, StageError> {
        info!(
            topic = problem.topic.as_str(),
            verified = verification.is_correct,
            "Generating explanation"
        );

        let user_prompt = format!(
            "Create a student-friendly explanation for this solution:\n\n\
             Problem: {}\n\
             Topic: {}\n\n\
             Solution Steps:\n{}\n\n\
             Final Answer: {}\n\n\
             Make it clear, encouraging, and educational. Return ONLY the JSON output.",
            problem.problem_text,
            problem.topic.as_str(),
            solution.steps.join("\n"),
            solution.final_answer
        );

        let outcome = self
            .runtime
            .request_json(
                "explainer",
                EXPLAINER_SYSTEM_PROMPT,
                user_prompt,
                EXPLAINER_TEMPERATURE,
            )
            .await?;

        let explanation = match outcome {
            JsonOutcome::Value(value) => match serde_json::from_value::<Explanation>(value) {
                Ok(explanation) => explanation,
                Err(e) => {
                    warn!(error = %e, "Explainer output did not match schema");
                    Explanation::fallback(&solution.reasoning, problem.topic)
                }
            },
            JsonOutcome::Unparseable(raw) => {
                warn!("Explainer returned non-JSON output");
                Explanation::fallback(&raw, problem.topic)
            }
            JsonOutcome::TimedOut => Explanation::fallback(&solution.reasoning, problem.topic),
        };

        Ok(explanation)
    }
}
