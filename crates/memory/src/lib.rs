//! Durable interaction memory for Math Mentor.
//!
//! Three independent stores live under one directory:
//!
//! - `interactions.jsonl` - append-only log of completed solve calls
//! - `feedback.jsonl` - append-only user feedback, never joined back
//! - `corrections.json` - learned OCR/ASR text corrections, rewritten in
//!   full on every mutation (durability over throughput; mutations are
//!   human-paced)
//!
//! Past-problem lookup is a deliberately coarse shared-token count over
//! same-topic records, cheap relative to the LLM-bound pipeline stages.

pub mod store;

pub use store::{InteractionStore, SimilarInteraction};
