//! Knowledge-base retriever: build-once index, k-NN lookup.

use std::path::PathBuf;
use std::sync::Arc;

use mentor_common::{KnowledgeSnippet, MentorError, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::chunker::chunk_text;
use crate::embedding::Embedder;
use crate::index::{IndexedChunk, VectorIndex};

/// Configuration for the retrieval pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Directory of knowledge-base markdown documents
    pub knowledge_dir: PathBuf,

    /// Where the persisted index lives
    pub index_dir: PathBuf,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Default k for retrieval
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".into()
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            knowledge_dir: PathBuf::from("./knowledge_base"),
            index_dir: PathBuf::from("./vector_store"),
            embedding_model: default_embedding_model(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
        }
    }
}

/// Retrieves the most relevant knowledge chunks for a query.
///
/// The backing index is built once (or loaded from disk when compatible)
/// and only read afterwards; `retrieve` never mutates it.
pub struct Retriever {
    config: RetrievalConfig,
    embedder: Arc<dyn Embedder>,
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl Retriever {
    pub fn new(config: RetrievalConfig, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            config,
            embedder,
            index: RwLock::new(None),
        }
    }

    pub fn top_k(&self) -> usize {
        self.config.top_k
    }

    fn index_path(&self) -> PathBuf {
        self.config.index_dir.join("index.json")
    }

    /// Build or load the index. Idempotent: a second call is a no-op, and
    /// a persisted index is reused only if it was built with the active
    /// embedding model.
    pub async fn build_index(&self) -> Result<()> {
        {
            let guard = self.index.read().await;
            if guard.is_some() {
                return Ok(());
            }
        }

        let mut guard = self.index.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let path = self.index_path();
        if path.exists() {
            match VectorIndex::load(&path) {
                Ok(index) if index.model() == self.embedder.identity() => {
                    info!(
                        path = %path.display(),
                        chunks = index.len(),
                        "Reusing persisted vector index"
                    );
                    *guard = Some(Arc::new(index));
                    return Ok(());
                }
                Ok(index) => {
                    warn!(
                        persisted_model = %index.model(),
                        active_model = %self.embedder.identity(),
                        "Embedding model changed; rebuilding index"
                    );
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load persisted index; rebuilding");
                }
            }
        }

        let index = self.build_from_knowledge_base().await?;
        index.save(&path)?;
        *guard = Some(Arc::new(index));
        Ok(())
    }

    async fn build_from_knowledge_base(&self) -> Result<VectorIndex> {
        let mut index = VectorIndex::new(self.embedder.identity(), self.embedder.dimension());

        let dir = &self.config.knowledge_dir;
        if !dir.exists() {
            warn!(dir = %dir.display(), "Knowledge base directory not found");
            return Ok(index);
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "md").unwrap_or(false))
            .collect();
        paths.sort();

        let mut sources: Vec<(String, usize)> = Vec::new();
        let mut texts: Vec<String> = Vec::new();

        for path in &paths {
            let content = std::fs::read_to_string(path)?;
            let source = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let chunks = chunk_text(&content, self.config.chunk_size, self.config.chunk_overlap);
            info!(source = %source, chunks = chunks.len(), "Loaded knowledge document");

            for (chunk_index, chunk) in chunks.into_iter().enumerate() {
                sources.push((source.clone(), chunk_index));
                texts.push(chunk);
            }
        }

        if texts.is_empty() {
            warn!("No documents loaded from knowledge base");
            return Ok(index);
        }

        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != texts.len() {
            return Err(MentorError::Retrieval(format!(
                "Embedder returned {} vectors for {} chunks",
                embeddings.len(),
                texts.len()
            )));
        }

        for (((source, chunk_index), content), embedding) in
            sources.into_iter().zip(texts).zip(embeddings)
        {
            index.push(IndexedChunk {
                source,
                chunk_index,
                content,
                embedding,
            });
        }

        info!(
            chunks = index.len(),
            model = %self.embedder.identity(),
            "Vector index built"
        );
        Ok(index)
    }

    /// Top-k chunks for `query`, best first. Side-effect free except for
    /// the logged lazy-build fallback when the index was never initialized.
    pub async fn retrieve(&self, query: &str, k: Option<usize>) -> Result<Vec<KnowledgeSnippet>> {
        let index = {
            let guard = self.index.read().await;
            guard.clone()
        };

        let index = match index {
            Some(index) => index,
            None => {
                warn!("Vector index not initialized; building lazily");
                self.build_index().await?;
                self.index
                    .read()
                    .await
                    .clone()
                    .ok_or_else(|| MentorError::Retrieval("Index build produced no index".into()))?
            }
        };

        if index.is_empty() {
            return Ok(vec![]);
        }

        let k = k.unwrap_or(self.config.top_k);
        let query_embedding = self
            .embedder
            .embed_batch(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MentorError::Retrieval("Empty query embedding".into()))?;

        Ok(index.search(&query_embedding, k))
    }
}
