//! Integration tests for index building and retrieval ranking.
//!
//! These use a deterministic token-hash embedder so they run without
//! downloading a real embedding model.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use mentor_common::Result;
use mentor_retrieval::{Embedder, RetrievalConfig, Retriever, VectorIndex};
use tempfile::TempDir;

const DIM: usize = 64;

/// Deterministic bag-of-tokens embedding: each token hashes to a bucket.
/// Identical texts get identical vectors; disjoint texts are orthogonal.
struct HashEmbedder {
    name: String,
}

impl HashEmbedder {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
        })
    }

    fn embed_one(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; DIM];
        for token in text.to_lowercase().split_whitespace() {
            let mut hash: u64 = 1469598103934665603;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            vector[(hash % DIM as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::embed_one(t)).collect())
    }

    fn identity(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

fn write_kb(dir: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        std::fs::write(dir.join(name), content).unwrap();
    }
}

fn test_config(root: &TempDir) -> RetrievalConfig {
    RetrievalConfig {
        knowledge_dir: root.path().join("kb"),
        index_dir: root.path().join("vector_store"),
        embedding_model: "hash-test".into(),
        chunk_size: 500,
        chunk_overlap: 50,
        top_k: 3,
    }
}

#[tokio::test]
async fn identical_query_ranks_its_chunk_first() {
    let root = TempDir::new().unwrap();
    write_kb(
        &root.path().join("kb"),
        &[
            ("algebra.md", "quadratic equations factor into linear terms"),
            ("probability.md", "independent events multiply probabilities"),
            ("calculus.md", "derivatives measure instantaneous change"),
        ],
    );

    let retriever = Retriever::new(test_config(&root), HashEmbedder::new("hash-test"));
    retriever.build_index().await.unwrap();

    let results = retriever
        .retrieve("quadratic equations factor into linear terms", None)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].source, "algebra.md");
    assert!((results[0].score.unwrap() - 1.0).abs() < 1e-5);
    assert!(results[0].score.unwrap() > results[1].score.unwrap());
}

#[tokio::test]
async fn build_index_is_idempotent() {
    let root = TempDir::new().unwrap();
    write_kb(&root.path().join("kb"), &[("doc.md", "some knowledge here")]);

    let retriever = Retriever::new(test_config(&root), HashEmbedder::new("hash-test"));
    retriever.build_index().await.unwrap();
    retriever.build_index().await.unwrap();

    let results = retriever.retrieve("some knowledge here", None).await.unwrap();
    // rebuilding must not duplicate index content
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn persisted_index_is_reused_across_instances() {
    let root = TempDir::new().unwrap();
    write_kb(&root.path().join("kb"), &[("doc.md", "persisted content")]);

    {
        let retriever = Retriever::new(test_config(&root), HashEmbedder::new("hash-test"));
        retriever.build_index().await.unwrap();
    }
    assert!(root.path().join("vector_store/index.json").exists());

    // Remove the knowledge base: a fresh instance must load from disk,
    // not rebuild from documents.
    std::fs::remove_dir_all(root.path().join("kb")).unwrap();

    let retriever = Retriever::new(test_config(&root), HashEmbedder::new("hash-test"));
    retriever.build_index().await.unwrap();
    let results = retriever.retrieve("persisted content", None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].source, "doc.md");
}

#[tokio::test]
async fn index_built_with_other_model_is_rebuilt() {
    let root = TempDir::new().unwrap();
    write_kb(&root.path().join("kb"), &[("doc.md", "fresh content")]);

    // Seed a persisted index claiming a different embedding model.
    let stale = VectorIndex::new("some-other-model", 8);
    stale
        .save(&root.path().join("vector_store/index.json"))
        .unwrap();

    let retriever = Retriever::new(test_config(&root), HashEmbedder::new("hash-test"));
    retriever.build_index().await.unwrap();

    // The stale (empty) index would return nothing; the rebuilt one hits.
    let results = retriever.retrieve("fresh content", None).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn retrieve_builds_lazily_when_uninitialized() {
    let root = TempDir::new().unwrap();
    write_kb(&root.path().join("kb"), &[("doc.md", "lazy build content")]);

    let retriever = Retriever::new(test_config(&root), HashEmbedder::new("hash-test"));
    // no explicit build_index call
    let results = retriever.retrieve("lazy build content", None).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn missing_knowledge_base_yields_empty_results() {
    let root = TempDir::new().unwrap();
    let retriever = Retriever::new(test_config(&root), HashEmbedder::new("hash-test"));
    retriever.build_index().await.unwrap();
    let results = retriever.retrieve("anything", None).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn k_override_limits_results() {
    let root = TempDir::new().unwrap();
    write_kb(
        &root.path().join("kb"),
        &[
            ("a.md", "alpha topic"),
            ("b.md", "beta topic"),
            ("c.md", "gamma topic"),
        ],
    );

    let retriever = Retriever::new(test_config(&root), HashEmbedder::new("hash-test"));
    retriever.build_index().await.unwrap();
    let results = retriever.retrieve("alpha topic", Some(1)).await.unwrap();
    assert_eq!(results.len(), 1);
}
