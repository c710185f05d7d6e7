//! Multimodal input normalization.
//!
//! OCR and ASR are external collaborators behind traits; this module owns
//! only the thresholding, spoken-math substitution and degradation policy.
//! Normalization never fails: engine errors and absent engines both come
//! back as zero-confidence results flagged for human review.

use std::sync::Arc;

use async_trait::async_trait;
use mentor_common::{InputKind, Result};
use tracing::{info, warn};

use crate::config::Thresholds;

/// What a recognition collaborator extracted from one payload.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub text: String,

    /// Aggregate confidence, when the engine exposes one
    pub confidence: Option<f32>,
}

/// Image-to-text collaborator.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<Recognition>;
}

/// Audio-to-text collaborator.
#[async_trait]
pub trait AsrEngine: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> Result<Recognition>;
}

/// One solve input with its payload kind.
pub enum InputPayload<'a> {
    Image(&'a [u8]),
    Audio(&'a [u8]),
    Text(&'a str),
}

impl InputPayload<'_> {
    pub fn kind(&self) -> InputKind {
        match self {
            InputPayload::Image(_) => InputKind::Image,
            InputPayload::Audio(_) => InputKind::Audio,
            InputPayload::Text(_) => InputKind::Text,
        }
    }
}

/// Result of input normalization, ready for the pipeline.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct NormalizedInput {
    pub text: String,
    pub confidence: f32,
    pub needs_hitl: bool,
    pub message: String,
}

impl NormalizedInput {
    fn failed(message: impl Into<String>) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            needs_hitl: true,
            message: message.into(),
        }
    }
}

/// Converts image/audio/text payloads into candidate problem statements.
pub struct InputNormalizer {
    ocr: Option<Arc<dyn OcrEngine>>,
    asr: Option<Arc<dyn AsrEngine>>,
    thresholds: Thresholds,
}

impl InputNormalizer {
    pub fn new(
        ocr: Option<Arc<dyn OcrEngine>>,
        asr: Option<Arc<dyn AsrEngine>>,
        thresholds: Thresholds,
    ) -> Self {
        Self {
            ocr,
            asr,
            thresholds,
        }
    }

    pub async fn normalize(&self, payload: InputPayload<'_>) -> NormalizedInput {
        match payload {
            InputPayload::Text(text) => self.normalize_text(text),
            InputPayload::Image(image) => self.normalize_image(image).await,
            InputPayload::Audio(audio) => self.normalize_audio(audio).await,
        }
    }

    fn normalize_text(&self, text: &str) -> NormalizedInput {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return NormalizedInput::failed("Empty input");
        }
        NormalizedInput {
            text: trimmed.to_string(),
            confidence: 1.0,
            needs_hitl: false,
            message: "Text input processed successfully".into(),
        }
    }

    async fn normalize_image(&self, image: &[u8]) -> NormalizedInput {
        let Some(ref ocr) = self.ocr else {
            return NormalizedInput::failed("No OCR engine configured");
        };

        let recognition = match ocr.recognize(image).await {
            Ok(recognition) => recognition,
            Err(e) => {
                warn!(error = %e, "OCR failed");
                return NormalizedInput::failed(format!("OCR failed: {e}"));
            }
        };

        if recognition.text.is_empty() {
            return NormalizedInput::failed("No text detected in image");
        }

        let confidence = recognition.confidence.unwrap_or(0.0).clamp(0.0, 1.0);
        let needs_hitl = confidence < self.thresholds.ocr_confidence;
        info!(confidence, needs_hitl, "OCR completed");

        NormalizedInput {
            text: recognition.text,
            confidence,
            needs_hitl,
            message: "OCR completed successfully".into(),
        }
    }

    async fn normalize_audio(&self, audio: &[u8]) -> NormalizedInput {
        let Some(ref asr) = self.asr else {
            return NormalizedInput::failed("No ASR engine configured");
        };

        let recognition = match asr.transcribe(audio).await {
            Ok(recognition) => recognition,
            Err(e) => {
                warn!(error = %e, "Transcription failed");
                return NormalizedInput::failed(format!("Transcription failed: {e}"));
            }
        };

        if recognition.text.is_empty() {
            return NormalizedInput::failed("No speech detected in audio");
        }

        // Prefer the engine's per-segment aggregate; fall back to the
        // configured constant for engines that report none.
        let confidence = recognition
            .confidence
            .unwrap_or(self.thresholds.asr_fallback_confidence)
            .clamp(0.0, 1.0);
        let needs_hitl = confidence < self.thresholds.asr_confidence;
        info!(confidence, needs_hitl, "Transcription completed");

        NormalizedInput {
            text: convert_spoken_math(&recognition.text),
            confidence,
            needs_hitl,
            message: "Audio transcription completed successfully".into(),
        }
    }
}

/// Rewrite spoken math phrases into notation. Multi-word phrases are
/// replaced before the single words they contain.
fn convert_spoken_math(text: &str) -> String {
    const CONVERSIONS: &[(&str, &str)] = &[
        ("square root of", "√"),
        ("x squared", "x²"),
        ("x cubed", "x³"),
        ("multiplied by", "×"),
        ("divided by", "÷"),
        ("squared", "²"),
        ("cubed", "³"),
        ("plus", "+"),
        ("minus", "-"),
        ("times", "×"),
        ("equals", "="),
        ("pi", "π"),
        ("theta", "θ"),
        ("alpha", "α"),
        ("beta", "β"),
        ("delta", "Δ"),
        ("sigma", "Σ"),
    ];

    let mut result = text.to_lowercase();
    for (phrase, symbol) in CONVERSIONS {
        result = result.replace(phrase, symbol);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_common::MentorError;

    struct FixedOcr {
        recognition: Recognition,
    }

    #[async_trait]
    impl OcrEngine for FixedOcr {
        async fn recognize(&self, _image: &[u8]) -> Result<Recognition> {
            Ok(self.recognition.clone())
        }
    }

    struct BrokenAsr;

    #[async_trait]
    impl AsrEngine for BrokenAsr {
        async fn transcribe(&self, _audio: &[u8]) -> Result<Recognition> {
            Err(MentorError::Input("codec not supported".into()))
        }
    }

    struct FixedAsr {
        recognition: Recognition,
    }

    #[async_trait]
    impl AsrEngine for FixedAsr {
        async fn transcribe(&self, _audio: &[u8]) -> Result<Recognition> {
            Ok(self.recognition.clone())
        }
    }

    fn normalizer(
        ocr: Option<Arc<dyn OcrEngine>>,
        asr: Option<Arc<dyn AsrEngine>>,
    ) -> InputNormalizer {
        InputNormalizer::new(ocr, asr, Thresholds::default())
    }

    #[tokio::test]
    async fn text_input_is_trimmed_and_confident() {
        let result = normalizer(None, None)
            .normalize(InputPayload::Text("  Solve x+1=2  "))
            .await;
        assert_eq!(result.text, "Solve x+1=2");
        assert_eq!(result.confidence, 1.0);
        assert!(!result.needs_hitl);
    }

    #[tokio::test]
    async fn empty_text_needs_review() {
        let result = normalizer(None, None)
            .normalize(InputPayload::Text("   "))
            .await;
        assert!(result.needs_hitl);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.message, "Empty input");
    }

    #[tokio::test]
    async fn missing_ocr_engine_degrades() {
        let result = normalizer(None, None)
            .normalize(InputPayload::Image(b"fake-png"))
            .await;
        assert!(result.needs_hitl);
        assert_eq!(result.message, "No OCR engine configured");
    }

    #[tokio::test]
    async fn low_ocr_confidence_flags_hitl() {
        let ocr = Arc::new(FixedOcr {
            recognition: Recognition {
                text: "x2 + 5x + 6 = O".into(),
                confidence: Some(0.45),
            },
        });
        let result = normalizer(Some(ocr), None)
            .normalize(InputPayload::Image(b"fake-png"))
            .await;
        assert_eq!(result.text, "x2 + 5x + 6 = O");
        assert!(result.needs_hitl);
    }

    #[tokio::test]
    async fn confident_ocr_passes() {
        let ocr = Arc::new(FixedOcr {
            recognition: Recognition {
                text: "x^2 + 5x + 6 = 0".into(),
                confidence: Some(0.92),
            },
        });
        let result = normalizer(Some(ocr), None)
            .normalize(InputPayload::Image(b"fake-png"))
            .await;
        assert!(!result.needs_hitl);
    }

    #[tokio::test]
    async fn asr_error_is_absorbed() {
        let result = normalizer(None, Some(Arc::new(BrokenAsr)))
            .normalize(InputPayload::Audio(b"fake-wav"))
            .await;
        assert!(result.needs_hitl);
        assert!(result.message.contains("codec not supported"));
    }

    #[tokio::test]
    async fn asr_without_confidence_uses_fallback_constant() {
        let asr = Arc::new(FixedAsr {
            recognition: Recognition {
                text: "x squared plus five x plus six equals zero".into(),
                confidence: None,
            },
        });
        let result = normalizer(None, Some(asr))
            .normalize(InputPayload::Audio(b"fake-wav"))
            .await;
        assert!((result.confidence - 0.85).abs() < 1e-6);
        assert!(!result.needs_hitl);
    }

    #[test]
    fn spoken_math_phrases_are_converted() {
        assert_eq!(
            convert_spoken_math("x squared plus five x plus six equals zero"),
            "x² + five x + six = zero"
        );
        assert_eq!(convert_spoken_math("square root of nine"), "√ nine");
        assert_eq!(convert_spoken_math("ten divided by two"), "ten ÷ two");
    }

    #[test]
    fn multiword_phrases_win_over_their_parts() {
        // "x squared" must become "x²", not "x ²"
        assert!(convert_spoken_math("x squared").contains("x²"));
    }
}
