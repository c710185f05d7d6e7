//! LLM transport for the Math Mentor pipeline.
//!
//! Every pipeline agent performs exactly one blocking round trip per call,
//! so the request shape here is a single system/user prompt pair rather
//! than a chat history. Providers are hidden behind the [`LlmClient`]
//! trait; [`build_llm_client`] assembles the configured provider with a
//! bounded retry decorator and a concurrency limiter.

pub mod anthropic;
pub mod client;
pub mod config;
pub mod openai;
pub mod retry;

pub use anthropic::AnthropicClient;
pub use client::{LlmClient, LlmRequest, LlmResponse, TokenUsage};
pub use config::{build_llm_client, LlmConfig, SemaphoredClient};
pub use openai::OpenAiClient;
pub use retry::{RetryConfig, RetryingClient};
