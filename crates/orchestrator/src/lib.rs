//! The Math Mentor pipeline orchestrator.
//!
//! One `solve` call walks a fixed sequence of stages, each consuming the
//! previous stage's output:
//!
//! ```text
//! raw text
//!    │
//!    ▼
//! ┌─────────┐   ┌──────────────┐   ┌───────────┐   ┌─────────┐
//! │ Parsing │ ─▶│ MemoryLookup │ ─▶│ Retrieval │ ─▶│ Routing │
//! └─────────┘   └──────────────┘   └───────────┘   └────┬────┘
//!                                                       │
//!    ┌───────────┐   ┌───────────┐   ┌─────────┐        │
//!    │  Stored   │◀─ │ Explaining│◀─ │Verifying│◀─ Solving
//!    └───────────┘   └───────────┘   └─────────┘
//! ```
//!
//! Every stage appends `started`/`completed` trace entries; soft signals
//! (ambiguous input, degraded lookups) become `warning` entries and the
//! pipeline keeps going. Only transport failures terminate a call, mapped
//! to the `quota_exceeded` or `error` variants of [`SolveResult`] with the
//! trace preserved. An interaction is committed exactly when Explaining
//! completes; aborted calls commit nothing.

pub mod config;
pub mod input;
pub mod pipeline;
pub mod result;

pub use config::{MentorConfig, Thresholds};
pub use input::{
    AsrEngine, InputNormalizer, InputPayload, NormalizedInput, OcrEngine, Recognition,
};
pub use pipeline::{Orchestrator, PipelineSettings};
pub use result::{RagSource, SimilarSummary, SolveResult};
