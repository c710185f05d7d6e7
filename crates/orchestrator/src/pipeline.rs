//! The pipeline state machine.

use std::sync::Arc;
use std::time::Duration;

use mentor_agents::{ExplainerAgent, ParserAgent, RouterAgent, SolverAgent, VerifierAgent};
use mentor_common::{
    CorrectionKind, Explanation, InputKind, Interaction, Result, Stage, StageError, TraceEntry,
    UserFeedback,
};
use mentor_llm::LlmClient;
use mentor_memory::InteractionStore;
use mentor_retrieval::Retriever;
use serde_json::json;
use tracing::{error, info, warn};

use crate::input::{InputNormalizer, InputPayload, NormalizedInput};
use crate::result::{RagSource, SimilarSummary, SolveResult};

/// How many similar past problems to surface per solve.
const SIMILAR_PROBLEMS: usize = 3;

/// Content preview length for surfaced RAG sources.
const RAG_PREVIEW_CHARS: usize = 200;

const QUOTA_MESSAGE: &str = "API quota exceeded. The provider is rate-limiting requests; \
wait for the quota window to reset, or configure a different API key, then try again.";

/// Pipeline-level knobs not owned by any collaborator.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Per-agent LLM round-trip timeout
    pub llm_timeout: Duration,

    /// Verifier confidence below this always requires human review
    pub verifier_confidence_threshold: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(60),
            verifier_confidence_threshold: 0.8,
        }
    }
}

/// Owns transient per-call state and sequences the collaborators.
///
/// All collaborators are injected fully initialized; their lifecycle
/// belongs to the process entry point.
pub struct Orchestrator {
    parser: ParserAgent,
    router: RouterAgent,
    solver: SolverAgent,
    verifier: VerifierAgent,
    explainer: ExplainerAgent,
    retriever: Arc<Retriever>,
    store: Arc<InteractionStore>,
    normalizer: InputNormalizer,
}

impl Orchestrator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        retriever: Arc<Retriever>,
        store: Arc<InteractionStore>,
        normalizer: InputNormalizer,
        settings: PipelineSettings,
    ) -> Self {
        info!("Initializing Math Mentor orchestrator");
        let timeout = settings.llm_timeout;
        Self {
            parser: ParserAgent::new(client.clone(), timeout),
            router: RouterAgent::new(client.clone(), timeout),
            solver: SolverAgent::new(client.clone(), timeout),
            verifier: VerifierAgent::new(
                client.clone(),
                timeout,
                settings.verifier_confidence_threshold,
            ),
            explainer: ExplainerAgent::new(client, timeout),
            retriever,
            store,
            normalizer,
        }
    }

    /// Build or load the retrieval index. Idempotent.
    pub async fn initialize_index(&self) -> Result<()> {
        self.retriever.build_index().await
    }

    /// Normalize one multimodal payload, replaying learned corrections
    /// for recognized (image/audio) text.
    pub async fn normalize_input(&self, payload: InputPayload<'_>) -> NormalizedInput {
        let kind = payload.kind();
        let mut normalized = self.normalizer.normalize(payload).await;

        let correction_kind = match kind {
            InputKind::Image => Some(CorrectionKind::Ocr),
            InputKind::Audio => Some(CorrectionKind::Asr),
            InputKind::Text => None,
        };
        if let Some(correction_kind) = correction_kind {
            normalized.text = self
                .store
                .apply_corrections(&normalized.text, correction_kind);
        }

        normalized
    }

    /// Run the full solve pipeline on one problem statement.
    pub async fn solve(&self, problem_text: &str, input_kind: InputKind) -> SolveResult {
        let mut trace: Vec<TraceEntry> = Vec::new();
        let timestamp = chrono::Utc::now().to_rfc3339();

        // Stage 1: parse the raw problem
        trace.push(TraceEntry::started(Stage::Parsing));
        let parsed = match self.parser.execute(problem_text, input_kind).await {
            Ok(parsed) => parsed,
            Err(e) => return terminal(e, Stage::Parsing, trace),
        };
        trace.push(TraceEntry::completed(Stage::Parsing).with_data(json!({
            "topic": parsed.topic.as_str(),
            "confidence": parsed.confidence,
        })));

        // Ambiguity is a soft signal: note it, keep solving
        let needs_clarification = parsed.needs_clarification;
        if needs_clarification {
            warn!("Problem flagged for clarification; solving with best interpretation");
            trace.push(TraceEntry::warning(
                Stage::Parsing,
                "Problem may be ambiguous; proceeding with best interpretation",
            ));
        }

        // Stage 2: similar past problems (annotates, never gates)
        trace.push(TraceEntry::started(Stage::MemoryLookup));
        let similar = match self
            .store
            .find_similar(&parsed.problem_text, parsed.topic, SIMILAR_PROBLEMS)
        {
            Ok(similar) => similar,
            Err(e) => {
                warn!(error = %e, "Similarity lookup failed; continuing without");
                trace.push(TraceEntry::warning(
                    Stage::MemoryLookup,
                    format!("Similarity lookup failed: {e}"),
                ));
                vec![]
            }
        };
        trace.push(
            TraceEntry::completed(Stage::MemoryLookup)
                .with_data(json!({"similar_found": similar.len()})),
        );

        // Stage 3: knowledge retrieval (degrades to empty context)
        trace.push(TraceEntry::started(Stage::Retrieval));
        let rag_context = match self.retriever.retrieve(&parsed.problem_text, None).await {
            Ok(context) => context,
            Err(e) => {
                warn!(error = %e, "Retrieval failed; solving without context");
                trace.push(TraceEntry::warning(
                    Stage::Retrieval,
                    format!("Retrieval failed: {e}"),
                ));
                vec![]
            }
        };
        trace.push(
            TraceEntry::completed(Stage::Retrieval)
                .with_data(json!({"documents_retrieved": rag_context.len()})),
        );

        // Stage 4: strategy routing
        trace.push(TraceEntry::started(Stage::Routing));
        let strategy = match self.router.execute(&parsed).await {
            Ok(strategy) => strategy,
            Err(e) => return terminal(e, Stage::Routing, trace),
        };
        trace.push(TraceEntry::completed(Stage::Routing).with_data(json!({
            "strategy": strategy.strategy,
            "confidence": strategy.confidence,
        })));

        // Stage 5: solving
        trace.push(TraceEntry::started(Stage::Solving));
        let solution = match self.solver.execute(&parsed, &strategy, &rag_context).await {
            Ok(solution) => solution,
            Err(e) => return terminal(e, Stage::Solving, trace),
        };
        trace.push(TraceEntry::completed(Stage::Solving).with_data(json!({
            "confidence": solution.confidence,
            "used_tool": solution.tool_result.is_some(),
        })));

        // Stage 6: verification
        trace.push(TraceEntry::started(Stage::Verifying));
        let verification = match self.verifier.execute(&parsed, &solution).await {
            Ok(verification) => verification,
            Err(e) => return terminal(e, Stage::Verifying, trace),
        };
        trace.push(TraceEntry::completed(Stage::Verifying).with_data(json!({
            "is_correct": verification.is_correct,
            "requires_hitl": verification.requires_hitl,
        })));

        // Stage 7: explanation - degrades, never aborts
        trace.push(TraceEntry::started(Stage::Explaining));
        let explanation = match self
            .explainer
            .execute(&parsed, &solution, &verification)
            .await
        {
            Ok(explanation) => explanation,
            Err(e) => {
                warn!(error = %e, "Explainer failed; using best-effort explanation");
                trace.push(TraceEntry::warning(
                    Stage::Explaining,
                    format!("Explanation degraded: {e}"),
                ));
                Explanation::fallback(&solution.reasoning, parsed.topic)
            }
        };
        trace.push(TraceEntry::completed(Stage::Explaining));

        // Stage 8: commit the interaction
        trace.push(TraceEntry::started(Stage::Stored));
        let similar_ids: Vec<String> = similar
            .iter()
            .map(|s| s.interaction.interaction_id.clone())
            .collect();

        let interaction = Interaction {
            interaction_id: String::new(), // filled in by the store
            timestamp,
            raw_input: problem_text.to_string(),
            input_type: input_kind,
            parsed_problem: parsed.clone(),
            retrieved_context: rag_context.clone(),
            solution: solution.clone(),
            verification: verification.clone(),
            explanation: explanation.clone(),
            similar_problem_ids: similar_ids,
        };

        let interaction_id = match self.store.store_interaction(interaction) {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "Failed to store interaction");
                trace.push(TraceEntry::error(Stage::Stored, e.to_string()));
                return SolveResult::Error {
                    message: format!("Failed to store interaction: {e}"),
                    execution_trace: trace,
                };
            }
        };
        trace.push(
            TraceEntry::completed(Stage::Stored)
                .with_data(json!({"interaction_id": interaction_id})),
        );

        info!(interaction_id = %interaction_id, "Problem solved");

        let requires_hitl = verification.requires_hitl;
        SolveResult::Success {
            interaction_id,
            parsed_problem: parsed,
            strategy,
            solution,
            verification,
            explanation,
            rag_sources: rag_context
                .iter()
                .map(|snippet| RagSource {
                    source: snippet.source.clone(),
                    content: snippet.content.chars().take(RAG_PREVIEW_CHARS).collect(),
                })
                .collect(),
            similar_problems: similar
                .into_iter()
                .map(|s| SimilarSummary {
                    interaction_id: s.interaction.interaction_id,
                    problem_text: s.interaction.parsed_problem.problem_text,
                    final_answer: s.interaction.solution.final_answer,
                    score: s.score,
                })
                .collect(),
            execution_trace: trace,
            requires_hitl,
            needs_clarification,
        }
    }

    /// Fire-and-forget feedback submission; failures are logged only.
    pub fn submit_feedback(&self, interaction_id: &str, feedback: UserFeedback) {
        if let Err(e) = self.store.store_feedback(interaction_id, feedback) {
            error!(interaction_id, error = %e, "Failed to store feedback");
        }
    }

    /// Fire-and-forget correction learning; failures are logged only.
    pub fn record_correction(&self, original: &str, corrected: &str, kind: CorrectionKind) {
        if let Err(e) = self.store.record_correction(original, corrected, kind) {
            error!(error = %e, "Failed to record correction");
        }
    }

    /// Look up one stored interaction by id.
    pub fn interaction(&self, interaction_id: &str) -> Result<Option<Interaction>> {
        self.store.get_interaction(interaction_id)
    }

    /// The most recent stored interactions, oldest first.
    pub fn recent_interactions(&self, n: usize) -> Result<Vec<Interaction>> {
        self.store.recent_interactions(n)
    }
}

/// Map a stage-aborting transport failure to its terminal result.
fn terminal(err: StageError, stage: Stage, mut trace: Vec<TraceEntry>) -> SolveResult {
    error!(stage = ?stage, error = %err, "Pipeline aborted");
    trace.push(TraceEntry::error(stage, err.to_string()));
    match err {
        StageError::QuotaExhausted(_) => SolveResult::QuotaExceeded {
            message: QUOTA_MESSAGE.to_string(),
            execution_trace: trace,
        },
        StageError::Upstream(message) => SolveResult::Error {
            message,
            execution_trace: trace,
        },
    }
}
