//! Generated artifacts: project summaries and question answers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tasklane_llm::TokenUsage;
use uuid::Uuid;

/// What kind of request produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Project summary
    Summary,
    /// Answer to a question about a project
    Answer,
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Summary => write!(f, "summary"),
            Self::Answer => write!(f, "answer"),
        }
    }
}

/// Output of a successful generation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    /// Unique artifact id
    pub id: Uuid,
    /// Summary or answer
    pub kind: ArtifactKind,
    /// Project the artifact describes
    pub subject_id: String,
    /// The question, for answers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Generated text
    pub text: String,
    /// Model that produced it
    pub model: String,
    /// Generation time
    pub created_at: DateTime<Utc>,
    /// Provider token usage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
}

/// A project summary
pub type SummaryArtifact = Artifact;

/// An answer to a project question
pub type AnswerArtifact = Artifact;

impl Artifact {
    /// Build a summary artifact
    #[must_use]
    pub fn summary(
        subject_id: impl Into<String>,
        text: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: ArtifactKind::Summary,
            subject_id: subject_id.into(),
            question: None,
            text: text.into(),
            model: model.into(),
            created_at: Utc::now(),
            usage: None,
        }
    }

    /// Build an answer artifact
    #[must_use]
    pub fn answer(
        subject_id: impl Into<String>,
        question: impl Into<String>,
        text: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            question: Some(question.into()),
            kind: ArtifactKind::Answer,
            ..Self::summary(subject_id, text, model)
        }
    }

    /// Attach token usage
    #[must_use]
    pub fn with_usage(mut self, usage: Option<TokenUsage>) -> Self {
        self.usage = usage;
        self
    }
}
