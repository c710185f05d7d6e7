//! Solver agent - produces the worked solution.

use std::sync::Arc;
use std::time::Duration;

use mentor_common::{KnowledgeSnippet, ParsedProblem, Solution, StageError, Strategy};
use mentor_llm::LlmClient;
use tracing::{info, warn};

use crate::base::{AgentRuntime, JsonOutcome};
use crate::symbolic;

const SOLVER_TEMPERATURE: f32 = 0.3;

/// Prompt-size control: only this many snippets reach the prompt, each cut
/// to this many characters.
const MAX_CONTEXT_SNIPPETS: usize = 2;
const MAX_SNIPPET_CHARS: usize = 500;

const SOLVER_SYSTEM_PROMPT: &str = r#"You are the solving stage of a JEE-level math mentor.
You solve problems step-by-step: reason, optionally compute, verify each step, conclude.

You may request ONE symbolic computation by including a "tool_call" object.
Available functions: solve, simplify, diff, integrate, limit, det, eval.
Example: {"function": "solve", "args": ["x^2 + 5x + 6 = 0"]}

STRICT OUTPUT FORMAT (JSON only):
{
  "steps": [
    "Step 1: Identify the equation...",
    "Step 2: Apply the quadratic formula..."
  ],
  "final_answer": "x = -2 or x = -3",
  "reasoning": "detailed explanation of the solution process",
  "confidence": 0.95,
  "tool_call": {"function": "solve", "args": ["x^2 + 5x + 6 = 0"]}
}

The tool_call field is optional. Omit it when no computation is needed."#;

/// Produces a [`Solution`] from the parsed problem, the routing decision
/// and retrieved knowledge. May perform one extra round trip through the
/// symbolic dispatcher when the model requests it.
pub struct SolverAgent {
    runtime: AgentRuntime,
}

impl SolverAgent {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            runtime: AgentRuntime::new(client, timeout),
        }
    }

    pub async fn execute(
        &self,
        problem: &ParsedProblem,
        strategy: &Strategy,
        context: &[KnowledgeSnippet],
    ) -> Result<Solution, StageError> {
        info!(
            topic = problem.topic.as_str(),
            snippets = context.len(),
            preview = %problem.problem_text.chars().take(80).collect::<String>(),
            "Solving problem"
        );

        let system_prompt = format!(
            "{SOLVER_SYSTEM_PROMPT}\n\nTopic: {}\nStrategy: {}\n\nReference Knowledge:\n{}",
            problem.topic.as_str(),
            strategy.approach,
            format_context(context),
        );

        let user_prompt = format!(
            "Solve this problem:\n\n\
             Problem: {}\n\
             Variables: {:?}\n\
             Constraints: {:?}\n\
             Equations: {:?}\n\n\
             Provide a step-by-step solution. Return ONLY the JSON output.",
            problem.problem_text, problem.variables, problem.constraints, problem.equations
        );

        let outcome = self
            .runtime
            .request_json("solver", &system_prompt, user_prompt, SOLVER_TEMPERATURE)
            .await?;

        let mut solution = match outcome {
            JsonOutcome::Value(value) => match serde_json::from_value::<Solution>(value) {
                Ok(solution) => solution.normalized(),
                Err(e) => {
                    warn!(error = %e, "Solver output did not match schema");
                    Solution::parse_failure("")
                }
            },
            JsonOutcome::Unparseable(raw) => {
                warn!("Solver returned non-JSON output");
                Solution::parse_failure(&raw)
            }
            JsonOutcome::TimedOut => Solution::parse_failure("Solving timed out"),
        };

        if let Some(ref tool_call) = solution.tool_call {
            let result = symbolic::dispatch(tool_call);
            info!(function = %tool_call.function, result = %result, "Symbolic tool dispatched");
            solution.tool_result = Some(result);
        }

        Ok(solution)
    }
}

/// At most the first two snippets, each truncated, rendered for the prompt.
fn format_context(context: &[KnowledgeSnippet]) -> String {
    if context.is_empty() {
        return "(none)".to_string();
    }
    context
        .iter()
        .take(MAX_CONTEXT_SNIPPETS)
        .map(|snippet| {
            let content: String = snippet.content.chars().take(MAX_SNIPPET_CHARS).collect();
            format!("Reference from {}:\n{}", snippet.source, content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticClient;
    use mentor_common::Topic;

    fn problem() -> ParsedProblem {
        ParsedProblem {
            problem_text: "Solve x^2+5x+6=0".into(),
            topic: Topic::Algebra,
            variables: vec!["x".into()],
            constraints: vec![],
            equations: vec!["x^2+5x+6=0".into()],
            needs_clarification: false,
            confidence: 0.95,
            reasoning: String::new(),
        }
    }

    fn strategy() -> Strategy {
        Strategy::manual_fallback("Factor the quadratic")
    }

    #[tokio::test]
    async fn solves_and_dispatches_tool_call() {
        let client = StaticClient::replying(&[r#"{
            "steps": ["Factor the quadratic", "Read off the roots"],
            "final_answer": "x = -2 or x = -3",
            "reasoning": "The quadratic factors as (x+2)(x+3)",
            "confidence": 0.95,
            "tool_call": {"function": "solve", "args": ["x^2 + 5x + 6 = 0"]}
        }"#]);

        let solution = SolverAgent::new(client, Duration::from_secs(1))
            .execute(&problem(), &strategy(), &[])
            .await
            .unwrap();

        assert_eq!(solution.final_answer, "x = -2 or x = -3");
        assert_eq!(solution.steps.len(), 2);
        assert_eq!(solution.tool_result.as_deref(), Some("x = -3 or x = -2"));
    }

    #[tokio::test]
    async fn tool_errors_are_captured_not_raised() {
        let client = StaticClient::replying(&[r#"{
            "steps": ["Try the tool"],
            "final_answer": "unknown",
            "reasoning": "",
            "confidence": 0.4,
            "tool_call": {"function": "exec", "args": ["rm -rf /"]}
        }"#]);

        let solution = SolverAgent::new(client, Duration::from_secs(1))
            .execute(&problem(), &strategy(), &[])
            .await
            .unwrap();

        assert_eq!(
            solution.tool_result.as_deref(),
            Some("error: unknown function 'exec'")
        );
    }

    #[tokio::test]
    async fn non_json_output_degrades_to_default() {
        let client = StaticClient::replying(&["The roots are -2 and -3, trust me."]);
        let solution = SolverAgent::new(client, Duration::from_secs(1))
            .execute(&problem(), &strategy(), &[])
            .await
            .unwrap();

        assert_eq!(solution.final_answer, "Error in solving");
        assert_eq!(solution.reasoning, "The roots are -2 and -3, trust me.");
        assert!((solution.confidence - 0.3).abs() < 1e-6);
        assert!(solution.tool_call.is_none());
    }

    #[test]
    fn context_is_capped_at_two_truncated_snippets() {
        let snippets: Vec<KnowledgeSnippet> = (0..4)
            .map(|i| KnowledgeSnippet {
                content: "a".repeat(800),
                source: format!("doc{i}.md"),
                score: None,
            })
            .collect();

        let formatted = format_context(&snippets);
        assert!(formatted.contains("doc0.md"));
        assert!(formatted.contains("doc1.md"));
        assert!(!formatted.contains("doc2.md"));
        // two 500-char bodies plus headers, far below 4 x 800
        assert!(formatted.len() < 1200);
    }

    #[test]
    fn empty_context_renders_placeholder() {
        assert_eq!(format_context(&[]), "(none)");
    }
}
