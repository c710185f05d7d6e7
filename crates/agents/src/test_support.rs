//! Scripted LLM clients for agent unit tests. No network involved.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use mentor_common::{MentorError, Result};
use mentor_llm::{LlmClient, LlmRequest, LlmResponse};

enum Script {
    Replies(Mutex<VecDeque<String>>),
    Failure(String),
    Stall,
}

/// An `LlmClient` that plays back canned responses, fails with a fixed
/// error, or never answers (for timeout tests).
pub(crate) struct StaticClient {
    script: Script,
}

impl StaticClient {
    pub fn replying(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Replies(Mutex::new(
                responses.iter().map(|s| s.to_string()).collect(),
            )),
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            script: Script::Failure(message.to_string()),
        })
    }

    pub fn stalled() -> Arc<Self> {
        Arc::new(Self {
            script: Script::Stall,
        })
    }
}

#[async_trait::async_trait]
impl LlmClient for StaticClient {
    async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse> {
        match &self.script {
            Script::Replies(queue) => {
                let content = queue
                    .lock()
                    .unwrap()
                    .pop_front()
                    .expect("scripted client ran out of responses");
                Ok(LlmResponse {
                    content,
                    model: "scripted".to_string(),
                    usage: None,
                    finish_reason: Some("stop".to_string()),
                })
            }
            Script::Failure(message) => Err(MentorError::Agent(message.clone())),
            Script::Stall => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                unreachable!("stalled client should be cancelled by timeout")
            }
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
