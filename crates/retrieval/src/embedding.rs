//! Sentence-embedding collaborator behind an object-safe trait.
//!
//! The production implementation wraps fastembed with lazy model
//! initialization; tests substitute deterministic embedders so retrieval
//! behavior can be checked without downloading a model.

use std::sync::Arc;

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use mentor_common::{MentorError, Result};
use once_cell::sync::OnceCell;
use tokio::task;
use tracing::{debug, info};

/// Embedding collaborator: texts in, fixed-dimension vectors out.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Stable identity of the underlying model; persisted with the index
    /// so a model change forces a rebuild.
    fn identity(&self) -> &str;

    fn dimension(&self) -> usize;
}

/// fastembed-backed embedder with lazy, shared model initialization.
pub struct FastEmbedder {
    name: String,
    model_kind: EmbeddingModel,
    dimension: usize,
    model: OnceCell<Arc<TextEmbedding>>,
}

impl FastEmbedder {
    /// Create an embedder from a model name string.
    pub fn from_model_str(name: &str) -> Result<Self> {
        let (model_kind, dimension) = match name {
            "all-MiniLM-L6-v2" => (EmbeddingModel::AllMiniLML6V2, 384),
            "all-MiniLM-L12-v2" => (EmbeddingModel::AllMiniLML12V2, 384),
            "bge-small-en-v1.5" => (EmbeddingModel::BGESmallENV15, 384),
            "bge-base-en-v1.5" => (EmbeddingModel::BGEBaseENV15, 768),
            "nomic-embed-text-v1.5" => (EmbeddingModel::NomicEmbedTextV15, 768),
            other => {
                return Err(MentorError::Config(format!(
                    "Unknown embedding model: '{other}'. Supported: all-MiniLM-L6-v2, \
                     all-MiniLM-L12-v2, bge-small-en-v1.5, bge-base-en-v1.5, nomic-embed-text-v1.5"
                )));
            }
        };

        Ok(Self {
            name: name.to_string(),
            model_kind,
            dimension,
            model: OnceCell::new(),
        })
    }

    fn get_or_init_model(&self) -> Result<Arc<TextEmbedding>> {
        self.model
            .get_or_try_init(|| {
                info!(model = %self.name, "Initializing embedding model");
                let options =
                    InitOptions::new(self.model_kind.clone()).with_show_download_progress(true);
                let model = TextEmbedding::try_new(options).map_err(|e| {
                    MentorError::Retrieval(format!("Failed to initialize embedding model: {e}"))
                })?;
                info!(
                    model = %self.name,
                    dimension = self.dimension,
                    "Embedding model initialized"
                );
                Ok(Arc::new(model))
            })
            .cloned()
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = self.get_or_init_model()?;
        let texts = texts.to_vec();

        // fastembed is synchronous; keep it off the async runtime threads
        let embeddings = task::spawn_blocking(move || {
            model
                .embed(texts, None)
                .map_err(|e| MentorError::Retrieval(format!("Failed to generate embeddings: {e}")))
        })
        .await
        .map_err(|e| MentorError::Retrieval(format!("Embedding task failed: {e}")))??;

        debug!(
            batch_size = embeddings.len(),
            dimension = embeddings.first().map(|e| e.len()).unwrap_or(0),
            "Generated batch embeddings"
        );

        Ok(embeddings)
    }

    fn identity(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_models_resolve_with_dimension() {
        let embedder = FastEmbedder::from_model_str("all-MiniLM-L6-v2").unwrap();
        assert_eq!(embedder.identity(), "all-MiniLM-L6-v2");
        assert_eq!(embedder.dimension(), 384);

        let embedder = FastEmbedder::from_model_str("bge-base-en-v1.5").unwrap();
        assert_eq!(embedder.dimension(), 768);
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(FastEmbedder::from_model_str("word2vec").is_err());
    }

    // Downloads the model from the network; run with: cargo test -- --ignored
    #[tokio::test]
    #[ignore = "Downloads model from network, slow"]
    async fn embeds_real_text() {
        let embedder = FastEmbedder::from_model_str("all-MiniLM-L6-v2").unwrap();
        let embeddings = embedder
            .embed_batch(&["The quadratic formula".to_string()])
            .await
            .unwrap();
        assert_eq!(embeddings.len(), 1);
        assert_eq!(embeddings[0].len(), 384);
        assert!(embeddings[0].iter().any(|&x| x != 0.0));
    }
}
