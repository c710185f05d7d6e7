//! Execution trace emitted by the pipeline for observability.
//!
//! The trace is scoped to a single solve call; it is rebuilt from scratch
//! on every invocation and surfaced verbatim on every terminal result.

use serde::{Deserialize, Serialize};

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parsing,
    MemoryLookup,
    Retrieval,
    Routing,
    Solving,
    Verifying,
    Explaining,
    Stored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceStatus {
    Started,
    Completed,
    Warning,
    Error,
}

/// One trace line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    pub stage: Stage,

    pub status: TraceStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// Stage-specific fields (confidence, counts, ...)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

impl TraceEntry {
    pub fn started(stage: Stage) -> Self {
        Self {
            stage,
            status: TraceStatus::Started,
            detail: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn completed(stage: Stage) -> Self {
        Self {
            stage,
            status: TraceStatus::Completed,
            detail: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn warning(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: TraceStatus::Warning,
            detail: Some(detail.into()),
            data: serde_json::Value::Null,
        }
    }

    pub fn error(stage: Stage, detail: impl Into<String>) -> Self {
        Self {
            stage,
            status: TraceStatus::Error,
            detail: Some(detail.into()),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Stage::MemoryLookup).unwrap(),
            "\"memory_lookup\""
        );
    }

    #[test]
    fn null_data_is_omitted() {
        let entry = TraceEntry::started(Stage::Parsing);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("data").is_none());
        assert!(json.get("detail").is_none());
        assert_eq!(json["status"], "started");
    }

    #[test]
    fn with_data_round_trips() {
        let entry = TraceEntry::completed(Stage::Retrieval)
            .with_data(serde_json::json!({"documents_retrieved": 3}));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["data"]["documents_retrieved"], 3);
    }
}
