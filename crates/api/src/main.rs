//! Math Mentor API server binary.
//!
//! Usage:
//!   mentor-api --config mentor.toml
//!   mentor-api --port 8080 --bind 0.0.0.0
//!
//! # Environment Variables
//!
//! - `MENTOR_API_KEY` - bearer token required on /api/v1 endpoints
//! - `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` - LLM provider credentials
//!
//! The entry point owns collaborator lifecycle: the LLM client, embedder,
//! store and retriever are constructed here and injected into the
//! orchestrator, which never initializes anything lazily on first use.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mentor_api::{serve, ApiKeyConfig, AppState};
use mentor_llm::{build_llm_client, LlmConfig};
use mentor_memory::InteractionStore;
use mentor_orchestrator::{InputNormalizer, MentorConfig, Orchestrator, PipelineSettings};
use mentor_retrieval::{FastEmbedder, Retriever};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mentor_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut port: u16 = 8080;
    let mut bind_addr: Option<String> = None;
    let mut config_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                if i + 1 < args.len() {
                    port = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    bind_addr = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            other => {
                warn!(arg = other, "Ignoring unknown argument");
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => {
            info!(path = %path, "Loading configuration");
            MentorConfig::from_file(&path)?
        }
        None => {
            info!("No --config given; using defaults (OpenAI-compatible endpoint)");
            default_config()
        }
    };

    // Collaborator lifecycle lives here, not inside the pipeline.
    let client = build_llm_client(&config.llm)?;
    let embedder = Arc::new(FastEmbedder::from_model_str(
        &config.retrieval.embedding_model,
    )?);
    let retriever = Arc::new(Retriever::new(config.retrieval.clone(), embedder));
    let store = Arc::new(InteractionStore::new(&config.memory_dir)?);
    // OCR/ASR engines are deployment-specific collaborators; without them
    // image and audio inputs degrade to needs-review results.
    let normalizer = InputNormalizer::new(None, None, config.thresholds.clone());

    let orchestrator = Orchestrator::new(
        client,
        retriever,
        store,
        normalizer,
        PipelineSettings {
            llm_timeout: Duration::from_millis(config.llm.timeout_ms),
            verifier_confidence_threshold: config.thresholds.verifier_confidence,
        },
    );

    info!("Building retrieval index");
    orchestrator.initialize_index().await?;

    let api_key = match std::env::var("MENTOR_API_KEY") {
        Ok(key) if !key.is_empty() => {
            info!("API key authentication enabled");
            Some(ApiKeyConfig::new(key))
        }
        _ => {
            warn!("MENTOR_API_KEY not set; API is unauthenticated");
            None
        }
    };

    let state = Arc::new(AppState::new(orchestrator));
    let bind = bind_addr.unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;

    serve(state, api_key, addr).await
}

fn default_config() -> MentorConfig {
    MentorConfig {
        llm: LlmConfig {
            provider: "openai".into(),
            model: "llama3".into(),
            api_key: None,
            api_url: None,
            timeout_ms: 60_000,
            max_concurrent_requests: 2,
            retry: Default::default(),
        },
        retrieval: Default::default(),
        memory_dir: "./memory".into(),
        thresholds: Default::default(),
    }
}
