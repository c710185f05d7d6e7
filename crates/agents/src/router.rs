//! Intent router agent - selects the solution strategy and tools.

use std::sync::Arc;
use std::time::Duration;

use mentor_common::{ParsedProblem, StageError, Strategy};
use mentor_llm::LlmClient;
use tracing::{info, warn};

use crate::base::{AgentRuntime, JsonOutcome};

const ROUTER_TEMPERATURE: f32 = 0.3;

const ROUTER_SYSTEM_PROMPT: &str = r#"You are the routing stage of a JEE-level math mentor.
Your job is to analyze a parsed problem and determine the best solution strategy and tools.

Available strategies:
- symbolic_manipulation: algebraic manipulation via the symbolic tool
- numerical_computation: numerical calculation
- step_by_step_derivation: derivatives, limits, integrals
- probability_analysis: combinatorics, probability calculations
- matrix_operations: linear algebra computations

Available tools:
- symbolic-math: symbolic mathematics dispatcher
- numeric: numerical computation
- scientific-computing: scientific computing routines
- manual: step-by-step manual solving

STRICT OUTPUT FORMAT (JSON only):
{
  "strategy": "name of primary strategy",
  "tools": ["symbolic-math", "manual"],
  "approach": "detailed approach description",
  "confidence": 0.9
}"#;

/// Chooses a [`Strategy`] for one parsed problem. Consumed only by the
/// Solver.
pub struct RouterAgent {
    runtime: AgentRuntime,
}

impl RouterAgent {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self {
            runtime: AgentRuntime::new(client, timeout),
        }
    }

    pub async fn execute(&self, problem: &ParsedProblem) -> Result<Strategy, StageError> {
        info!(topic = problem.topic.as_str(), "Routing problem");

        let user_prompt = format!(
            "Determine the solution strategy for this problem:\n\n\
             Topic: {}\n\
             Problem: {}\n\
             Variables: {:?}\n\
             Equations: {:?}\n\n\
             Return ONLY the JSON output.",
            problem.topic.as_str(),
            problem.problem_text,
            problem.variables,
            problem.equations
        );

        let outcome = self
            .runtime
            .request_json("router", ROUTER_SYSTEM_PROMPT, user_prompt, ROUTER_TEMPERATURE)
            .await?;

        let strategy = match outcome {
            JsonOutcome::Value(value) => match serde_json::from_value::<Strategy>(value) {
                Ok(strategy) => strategy.normalized(),
                Err(e) => {
                    warn!(error = %e, "Router output did not match schema");
                    Strategy::manual_fallback("Solve step-by-step manually")
                }
            },
            JsonOutcome::Unparseable(_) => {
                warn!("Router returned non-JSON output");
                Strategy::manual_fallback("Solve step-by-step manually")
            }
            JsonOutcome::TimedOut => Strategy::manual_fallback("Routing timed out; solving manually"),
        };

        Ok(strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticClient;
    use mentor_common::{StrategyKind, ToolKind, Topic};

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

    #[tokio::test]
    async fn routes_to_symbolic_manipulation() {
        let client = StaticClient::replying(&[r#"{
            "strategy": "symbolic_manipulation",
            "tools": ["symbolic-math"],
            "approach": "Factor the quadratic",
            "confidence": 0.9
        }"#]);

        let strategy = RouterAgent::new(client, Duration::from_secs(1))
            .execute(&problem())
            .await
            .unwrap();

        assert_eq!(strategy.strategy, StrategyKind::SymbolicManipulation);
        assert_eq!(strategy.tools, vec![ToolKind::SymbolicMath]);
        assert_eq!(strategy.approach, "Factor the quadratic");
    }

    #[tokio::test]
    async fn unknown_strategy_name_falls_back_to_manual() {
        let client = StaticClient::replying(&[r#"{
            "strategy": "astrology",
            "tools": ["tarot"],
            "approach": "guess",
            "confidence": 0.9
        }"#]);

        let strategy = RouterAgent::new(client, Duration::from_secs(1))
            .execute(&problem())
            .await
            .unwrap();

        assert_eq!(strategy.strategy, StrategyKind::Manual);
        assert_eq!(strategy.tools, vec![ToolKind::Manual]);
    }

    #[tokio::test]
    async fn prose_output_falls_back_to_manual() {
        let client = StaticClient::replying(&["Just factor it."]);
        let strategy = RouterAgent::new(client, Duration::from_secs(1))
            .execute(&problem())
            .await
            .unwrap();

        assert_eq!(strategy.strategy, StrategyKind::Manual);
        assert!((strategy.confidence - 0.5).abs() < 1e-6);
    }
}
