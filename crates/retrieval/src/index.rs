//! Persisted cosine-similarity vector index.

use std::path::Path;

use mentor_common::{KnowledgeSnippet, MentorError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One indexed chunk. Identity is `(source, chunk_index)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub source: String,
    pub chunk_index: usize,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// In-memory vector index with JSON persistence.
///
/// Chunks are kept in insertion order; search is a stable sort by
/// descending similarity, so equal scores rank in insertion order.
#[derive(Debug, Serialize, Deserialize)]
pub struct VectorIndex {
    model: String,
    dimension: usize,
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    pub fn new(model: impl Into<String>, dimension: usize) -> Self {
        Self {
            model: model.into(),
            dimension,
            chunks: Vec::new(),
        }
    }

    /// Identity of the embedding model this index was built with.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn push(&mut self, chunk: IndexedChunk) {
        self.chunks.push(chunk);
    }

    /// k-nearest chunks by cosine similarity, best first.
    pub fn search(&self, query_embedding: &[f32], k: usize) -> Vec<KnowledgeSnippet> {
        let mut scored: Vec<(f32, &IndexedChunk)> = self
            .chunks
            .iter()
            .map(|chunk| (cosine_similarity(query_embedding, &chunk.embedding), chunk))
            .collect();

        // stable: ties keep document insertion order
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(score, chunk)| KnowledgeSnippet {
                content: chunk.content.clone(),
                source: chunk.source.clone(),
                score: Some(score),
            })
            .collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), chunks = self.chunks.len(), "Vector index saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let index: Self = serde_json::from_str(&content).map_err(|e| {
            MentorError::Retrieval(format!(
                "Corrupt index file '{}': {e}",
                path.display()
            ))
        })?;
        debug!(path = %path.display(), chunks = index.chunks.len(), "Vector index loaded");
        Ok(index)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, idx: usize, content: &str, embedding: Vec<f32>) -> IndexedChunk {
        IndexedChunk {
            source: source.to_string(),
            chunk_index: idx,
            content: content.to_string(),
            embedding,
        }
    }

    #[test]
    fn exact_match_ranks_first() {
        let mut index = VectorIndex::new("test-model", 3);
        index.push(chunk("a.md", 0, "quadratics", vec![1.0, 0.0, 0.0]));
        index.push(chunk("b.md", 0, "probability", vec![0.0, 1.0, 0.0]));
        index.push(chunk("c.md", 0, "matrices", vec![0.0, 0.0, 1.0]));

        let results = index.search(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].content, "quadratics");
        assert!((results[0].score.unwrap() - 1.0).abs() < 1e-6);
        assert!(results[0].score.unwrap() > results[1].score.unwrap());
    }

    #[test]
    fn ties_keep_insertion_order() {
        let mut index = VectorIndex::new("test-model", 2);
        index.push(chunk("first.md", 0, "first", vec![1.0, 0.0]));
        index.push(chunk("second.md", 0, "second", vec![1.0, 0.0]));

        let results = index.search(&[1.0, 0.0], 2);
        assert_eq!(results[0].source, "first.md");
        assert_eq!(results[1].source, "second.md");
    }

    #[test]
    fn scaled_vectors_have_equal_cosine() {
        let sim_a = cosine_similarity(&[2.0, 0.0], &[1.0, 0.0]);
        let sim_b = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]);
        assert!((sim_a - sim_b).abs() < 1e-6);
    }

    #[test]
    fn zero_or_mismatched_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store").join("index.json");

        let mut index = VectorIndex::new("test-model", 2);
        index.push(chunk("a.md", 0, "content", vec![0.5, 0.5]));
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path).unwrap();
        assert_eq!(loaded.model(), "test-model");
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(VectorIndex::load(&dir.path().join("nope.json")).is_err());
    }
}
