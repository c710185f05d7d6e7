//! Common types shared across Math Mentor crates.
//!
//! This crate provides the error taxonomy, the domain data model
//! (parsed problems, strategies, solutions, verifications, explanations,
//! interactions) and the execution-trace types that the pipeline and the
//! API boundary both reference without circular dependencies.

pub mod error;
pub mod interaction;
pub mod problem;
pub mod solution;
pub mod trace;

pub use error::{MentorError, Result, StageError};
pub use interaction::{CorrectionKind, FeedbackRecord, InputKind, Interaction, UserFeedback};
pub use problem::{ParsedProblem, Topic};
pub use solution::{
    Explanation, KnowledgeSnippet, Solution, Strategy, StrategyKind, ToolCall, ToolKind,
    Verification,
};
pub use trace::{Stage, TraceEntry, TraceStatus};
