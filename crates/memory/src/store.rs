//! Append-only interaction store with learned-correction replay.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use indexmap::IndexMap;
use mentor_common::{
    CorrectionKind, FeedbackRecord, Interaction, MentorError, Result, Topic, UserFeedback,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Records below this many shared tokens are not considered similar.
const MIN_TOKEN_OVERLAP: usize = 2;

/// Learned literal text replacements, persisted as one JSON document.
///
/// IndexMap keeps insertion order: replacements can interact (a later
/// replacement may match text introduced by an earlier one), so iteration
/// order is part of the observable behavior.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Corrections {
    #[serde(default)]
    ocr: IndexMap<String, String>,

    #[serde(default)]
    asr: IndexMap<String, String>,
}

impl Corrections {
    fn map(&self, kind: CorrectionKind) -> &IndexMap<String, String> {
        match kind {
            CorrectionKind::Ocr => &self.ocr,
            CorrectionKind::Asr => &self.asr,
        }
    }

    fn map_mut(&mut self, kind: CorrectionKind) -> &mut IndexMap<String, String> {
        match kind {
            CorrectionKind::Ocr => &mut self.ocr,
            CorrectionKind::Asr => &mut self.asr,
        }
    }
}

/// A past interaction together with its token-overlap score.
#[derive(Debug, Clone)]
pub struct SimilarInteraction {
    pub score: usize,
    pub interaction: Interaction,
}

/// Exclusive owner of the durable solve history, feedback log and
/// correction maps. Writes are serialized through one lock; reads scan
/// the append-only files directly.
pub struct InteractionStore {
    interactions_path: PathBuf,
    feedback_path: PathBuf,
    corrections_path: PathBuf,
    state: Mutex<Corrections>,
}

impl InteractionStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let corrections_path = dir.join("corrections.json");
        let corrections = load_corrections(&corrections_path);

        Ok(Self {
            interactions_path: dir.join("interactions.jsonl"),
            feedback_path: dir.join("feedback.jsonl"),
            corrections_path,
            state: Mutex::new(corrections),
        })
    }

    /// Deterministic id for one `(timestamp, raw_input)` pair.
    pub fn interaction_id(timestamp: &str, raw_input: &str) -> String {
        let digest = Sha256::digest(format!("{timestamp}_{raw_input}").as_bytes());
        hex::encode(digest)[..16].to_string()
    }

    /// Append one interaction, filling in its deterministic id.
    pub fn store_interaction(&self, mut interaction: Interaction) -> Result<String> {
        let id = Self::interaction_id(&interaction.timestamp, &interaction.raw_input);
        interaction.interaction_id = id.clone();

        let line = serde_json::to_string(&interaction)?;
        {
            let _guard = self.lock();
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.interactions_path)?;
            writeln!(file, "{line}")?;
        }

        info!(interaction_id = %id, "Stored interaction");
        Ok(id)
    }

    /// Scan from the start; the earliest record with a matching id wins.
    pub fn get_interaction(&self, interaction_id: &str) -> Result<Option<Interaction>> {
        if !self.interactions_path.exists() {
            return Ok(None);
        }

        for interaction in self.read_interactions()? {
            if interaction.interaction_id == interaction_id {
                return Ok(Some(interaction));
            }
        }
        Ok(None)
    }

    /// The `n` most recent interactions, oldest first.
    pub fn recent_interactions(&self, n: usize) -> Result<Vec<Interaction>> {
        if !self.interactions_path.exists() {
            return Ok(vec![]);
        }
        let mut interactions = self.read_interactions()?;
        if interactions.len() > n {
            interactions.drain(..interactions.len() - n);
        }
        Ok(interactions)
    }

    /// Past problems with the same topic, ranked by shared-token count.
    ///
    /// Similarity is the number of shared whitespace-delimited lowercase
    /// tokens; records sharing fewer than two tokens are skipped.
    pub fn find_similar(
        &self,
        problem_text: &str,
        topic: Topic,
        n: usize,
    ) -> Result<Vec<SimilarInteraction>> {
        if !self.interactions_path.exists() {
            return Ok(vec![]);
        }

        let query_lower = problem_text.to_lowercase();
        let query_tokens: HashSet<&str> = query_lower.split_whitespace().collect();

        let mut similar: Vec<SimilarInteraction> = Vec::new();
        for interaction in self.read_interactions()? {
            if interaction.parsed_problem.topic != topic {
                continue;
            }

            let past_lower = interaction.parsed_problem.problem_text.to_lowercase();
            let past_tokens: HashSet<&str> = past_lower.split_whitespace().collect();
            let overlap = query_tokens.intersection(&past_tokens).count();

            if overlap >= MIN_TOKEN_OVERLAP {
                similar.push(SimilarInteraction {
                    score: overlap,
                    interaction,
                });
            }
        }

        similar.sort_by(|a, b| b.score.cmp(&a.score));
        similar.truncate(n);

        debug!(
            topic = topic.as_str(),
            found = similar.len(),
            "Similarity lookup completed"
        );
        Ok(similar)
    }

    /// Append one feedback entry. Never validated against the interaction
    /// log; feedback is write-only from the pipeline's perspective.
    pub fn store_feedback(&self, interaction_id: &str, feedback: UserFeedback) -> Result<()> {
        let record = FeedbackRecord {
            interaction_id: interaction_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            feedback,
        };

        let line = serde_json::to_string(&record)?;
        {
            let _guard = self.lock();
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.feedback_path)?;
            writeln!(file, "{line}")?;
        }

        info!(interaction_id = %interaction_id, "Stored feedback");
        Ok(())
    }

    /// Apply every learned replacement for `kind` in insertion order.
    pub fn apply_corrections(&self, text: &str, kind: CorrectionKind) -> String {
        let state = self.lock();
        let mut corrected = text.to_string();
        for (original, replacement) in state.map(kind) {
            if corrected.contains(original.as_str()) {
                corrected = corrected.replace(original.as_str(), replacement);
                debug!(original = %original, replacement = %replacement, "Applied correction");
            }
        }
        corrected
    }

    /// Upsert one replacement and persist the whole correction document.
    pub fn record_correction(
        &self,
        original: &str,
        corrected: &str,
        kind: CorrectionKind,
    ) -> Result<()> {
        let mut state = self.lock();
        state
            .map_mut(kind)
            .insert(original.to_string(), corrected.to_string());
        save_corrections(&self.corrections_path, &state)?;
        info!(kind = ?kind, original = %original, corrected = %corrected, "Recorded correction");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Corrections> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_interactions(&self) -> Result<Vec<Interaction>> {
        let file = std::fs::File::open(&self.interactions_path)?;
        let reader = BufReader::new(file);

        let mut interactions = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Interaction>(&line) {
                Ok(interaction) => interactions.push(interaction),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable interaction record");
                }
            }
        }
        Ok(interactions)
    }
}

fn load_corrections(path: &Path) -> Corrections {
    if !path.exists() {
        return Corrections::default();
    }
    match std::fs::read_to_string(path)
        .map_err(MentorError::from)
        .and_then(|content| serde_json::from_str(&content).map_err(MentorError::from))
    {
        Ok(corrections) => corrections,
        Err(e) => {
            warn!(error = %e, "Failed to load corrections; starting empty");
            Corrections::default()
        }
    }
}

fn save_corrections(path: &Path, corrections: &Corrections) -> Result<()> {
    let json = serde_json::to_string_pretty(corrections)?;
    std::fs::write(path, json)?;
    Ok(())
}
