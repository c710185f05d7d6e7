//! Retrieval-augmented generation support for Math Mentor.
//!
//! A fixed knowledge base of markdown documents is chunked into
//! overlapping windows, embedded once with a sentence-embedding model,
//! and indexed for cosine-similarity lookup:
//!
//! ```text
//! knowledge_base/*.md -> chunker -> embedder -> VectorIndex (persisted)
//!                                                    |
//!                               retrieve(query, k) <-+
//! ```
//!
//! The index is persisted next to the knowledge base, keyed by the
//! embedding model identity: an index built with one model is never
//! silently reused with another.

pub mod chunker;
pub mod embedding;
pub mod index;
pub mod retriever;

pub use chunker::chunk_text;
pub use embedding::{Embedder, FastEmbedder};
pub use index::{IndexedChunk, VectorIndex};
pub use retriever::{RetrievalConfig, Retriever};
