//! Per-subject question history
//!
//! Log of generated answers ordered by creation time, oldest first. Only answers that
//! were actually generated are recorded; cache hits are not repeated.

use crate::artifact::{AnswerArtifact, ArtifactKind};
use dashmap::DashMap;

/// Answer log keyed by subject id
#[derive(Debug, Default)]
pub struct QuestionHistory {
    entries: DashMap<String, Vec<AnswerArtifact>>,
}

impl QuestionHistory {
    /// Create an empty history
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an answer at its creation-time position. Non-answer
    /// artifacts are ignored.
    pub fn record(&self, answer: AnswerArtifact) {
        if answer.kind != ArtifactKind::Answer {
            return;
        }
        let mut answers = self.entries.entry(answer.subject_id.clone()).or_default();
        // Fills finish out of order; keep the log sorted by creation time
        let at = answers.partition_point(|a| a.created_at <= answer.created_at);
        answers.insert(at, answer);
    }

    /// All answers for a subject, oldest first
    #[must_use]
    pub fn list(&self, subject_id: &str) -> Vec<AnswerArtifact> {
        self.entries
            .get(subject_id)
            .map(|answers| answers.clone())
            .unwrap_or_default()
    }

    /// Number of answers recorded for a subject
    #[must_use]
    pub fn count(&self, subject_id: &str) -> usize {
        self.entries.get(subject_id).map_or(0, |a| a.len())
    }
}
