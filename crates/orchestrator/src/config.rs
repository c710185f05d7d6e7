//! Configuration for the whole pipeline.

use std::path::PathBuf;

use mentor_llm::LlmConfig;
use mentor_retrieval::RetrievalConfig;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Confidence thresholds threaded through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    /// Below this OCR confidence, image input is flagged for review
    #[serde(default = "default_ocr_confidence")]
    pub ocr_confidence: f32,

    /// Below this ASR confidence, audio input is flagged for review
    #[serde(default = "default_asr_confidence")]
    pub asr_confidence: f32,

    /// Below this verifier confidence, the verdict always requires HITL
    #[serde(default = "default_verifier_confidence")]
    pub verifier_confidence: f32,

    /// Assumed transcription confidence when the ASR engine reports none
    #[serde(default = "default_asr_fallback_confidence")]
    pub asr_fallback_confidence: f32,
}

fn default_ocr_confidence() -> f32 {
    0.7
}

fn default_asr_confidence() -> f32 {
    0.7
}

fn default_verifier_confidence() -> f32 {
    0.8
}

fn default_asr_fallback_confidence() -> f32 {
    0.85
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ocr_confidence: default_ocr_confidence(),
            asr_confidence: default_asr_confidence(),
            verifier_confidence: default_verifier_confidence(),
            asr_fallback_confidence: default_asr_fallback_confidence(),
        }
    }
}

/// Top-level configuration, loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentorConfig {
    pub llm: LlmConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Directory for the interaction/feedback/correction stores
    #[serde(default = "default_memory_dir")]
    pub memory_dir: PathBuf,

    #[serde(default)]
    pub thresholds: Thresholds,
}

fn default_memory_dir() -> PathBuf {
    PathBuf::from("./memory")
}

impl MentorConfig {
    /// Load configuration from a TOML file.
    ///
    /// Warns when an API key is stored in the file; environment variables
    /// are the recommended channel for secrets.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;

        if config.llm.api_key.is_some() {
            warn!(
                "API key found in config file '{}'. For better security, \
                 use environment variables instead (OPENAI_API_KEY, ANTHROPIC_API_KEY).",
                path.display()
            );
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_CONFIG: &str = r#"
memory_dir = "./data/memory"

[llm]
provider = "openai"
model = "gpt-4o"

[retrieval]
knowledge_dir = "./kb"
index_dir = "./index"
chunk_size = 400
chunk_overlap = 40

[thresholds]
verifier_confidence = 0.9
"#;

    #[test]
    fn full_config_parses() {
        let config: MentorConfig = toml::from_str(TOML_CONFIG).unwrap();
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.retrieval.chunk_size, 400);
        assert_eq!(config.memory_dir, PathBuf::from("./data/memory"));
        assert!((config.thresholds.verifier_confidence - 0.9).abs() < 1e-6);
        // unspecified thresholds keep their defaults
        assert!((config.thresholds.ocr_confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config: MentorConfig = toml::from_str(
            r#"
[llm]
provider = "anthropic"
model = "claude-sonnet-4-20250514"
"#,
        )
        .unwrap();
        assert_eq!(config.memory_dir, PathBuf::from("./memory"));
        assert_eq!(config.retrieval.top_k, 3);
        assert!((config.thresholds.asr_fallback_confidence - 0.85).abs() < 1e-6);
    }
}
