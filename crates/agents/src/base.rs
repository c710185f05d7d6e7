//! Shared round-trip plumbing for all five agents.

use std::sync::Arc;
use std::time::Duration;

use mentor_common::StageError;
use mentor_llm::{LlmClient, LlmRequest};
use tracing::{debug, warn};

/// Outcome of one JSON-contract round trip.
///
/// Transport failures are not represented here; they surface as
/// `Err(StageError)` from [`AgentRuntime::request_json`]. Everything in
/// this enum is recoverable at the agent boundary.
#[derive(Debug)]
pub enum JsonOutcome {
    /// Extracted and parsed JSON
    Value(serde_json::Value),
    /// The model answered, but not with parseable JSON
    Unparseable(String),
    /// The round trip exceeded the caller-supplied timeout
    TimedOut,
}

/// One LLM client plus the per-round-trip timeout, shared by composition
/// across the agent structs.
#[derive(Clone)]
pub struct AgentRuntime {
    client: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl AgentRuntime {
    pub fn new(client: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Perform one round trip and leniently parse the response as JSON.
    ///
    /// A timeout follows the same recovery path as unparseable output;
    /// transport errors are classified (quota vs upstream) and returned.
    pub async fn request_json(
        &self,
        agent: &str,
        system_prompt: &str,
        user_prompt: String,
        temperature: f32,
    ) -> Result<JsonOutcome, StageError> {
        let request = LlmRequest::new(system_prompt, user_prompt).with_temperature(temperature);

        let response = match tokio::time::timeout(self.timeout, self.client.complete(request)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let message = e.to_string();
                warn!(agent, error = %message, "LLM round trip failed");
                return Err(StageError::classify(message));
            }
            Err(_) => {
                warn!(agent, timeout_ms = self.timeout.as_millis() as u64, "LLM round trip timed out");
                return Ok(JsonOutcome::TimedOut);
            }
        };

        debug!(
            agent,
            response_len = response.content.len(),
            "LLM round trip completed"
        );

        match parse_json_lenient(&response.content) {
            Some(value) => Ok(JsonOutcome::Value(value)),
            None => Ok(JsonOutcome::Unparseable(response.content)),
        }
    }
}

/// Best-effort JSON extraction.
///
/// Models routinely wrap JSON in prose or code fences, so the substring
/// from the first `{` to the last `}` is tried before the whole response.
pub fn parse_json_lenient(response: &str) -> Option<serde_json::Value> {
    if let Some(window) = json_window(response) {
        if let Ok(value) = serde_json::from_str(window) {
            return Some(value);
        }
    }
    serde_json::from_str(response.trim()).ok()
}

fn json_window(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    if end > start {
        Some(&s[start..=end])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticClient;

    #[test]
    fn parses_bare_json() {
        let value = parse_json_lenient(r#"{"topic":"algebra"}"#).unwrap();
        assert_eq!(value["topic"], "algebra");
    }

    #[test]
    fn parses_json_wrapped_in_prose() {
        let response = r#"Sure! Here is the result:
{"topic": "calculus", "confidence": 0.9}
Let me know if you need anything else."#;
        let value = parse_json_lenient(response).unwrap();
        assert_eq!(value["topic"], "calculus");
    }

    #[test]
    fn parses_json_in_code_fence() {
        let response = "```json\n{\"is_correct\": true}\n```";
        let value = parse_json_lenient(response).unwrap();
        assert_eq!(value["is_correct"], true);
    }

    #[test]
    fn window_spans_first_to_last_brace() {
        // Two objects in one response: the window covers both, which is
        // invalid JSON, so the whole-response fallback also fails.
        let response = r#"{"a":1} and {"b":2}"#;
        assert!(parse_json_lenient(response).is_none());
    }

    #[test]
    fn rejects_plain_prose() {
        assert!(parse_json_lenient("I think it's right").is_none());
        assert!(parse_json_lenient("").is_none());
    }

    #[test]
    fn rejects_reversed_braces() {
        assert!(json_window("} backwards {").is_none());
    }

    #[tokio::test]
    async fn timeout_is_recoverable() {
        let client = StaticClient::stalled();
        let runtime = AgentRuntime::new(client, Duration::from_millis(20));
        let outcome = runtime
            .request_json("test", "system", "user".into(), 0.3)
            .await
            .unwrap();
        assert!(matches!(outcome, JsonOutcome::TimedOut));
    }

    #[tokio::test]
    async fn transport_error_classifies_quota() {
        let client = StaticClient::failing("API error 429: quota exhausted");
        let runtime = AgentRuntime::new(client, Duration::from_secs(1));
        let err = runtime
            .request_json("test", "system", "user".into(), 0.3)
            .await
            .unwrap_err();
        assert!(err.is_quota());
    }

    #[tokio::test]
    async fn prose_response_is_unparseable_not_error() {
        let client = StaticClient::replying(&["I think it's right"]);
        let runtime = AgentRuntime::new(client, Duration::from_secs(1));
        let outcome = runtime
            .request_json("test", "system", "user".into(), 0.3)
            .await
            .unwrap();
        match outcome {
            JsonOutcome::Unparseable(raw) => assert_eq!(raw, "I think it's right"),
            other => panic!("expected Unparseable, got {other:?}"),
        }
    }
}
