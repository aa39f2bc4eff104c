//! Subjects (projects) the gateway summarizes and answers questions about
//!
//! Persistence lives outside the gateway. [`SubjectSource`] is the read
//! seam; [`InMemorySubjectStore`] backs the binary and the tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Workflow state of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started
    #[default]
    Todo,
    /// Being worked on
    InProgress,
    /// Waiting on something else
    Blocked,
    /// Finished
    Done,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Todo => write!(f, "todo"),
            Self::InProgress => write!(f, "in progress"),
            Self::Blocked => write!(f, "blocked"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A task inside a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskItem {
    /// Task title
    pub title: String,
    /// Workflow state
    #[serde(default)]
    pub status: TaskStatus,
    /// Assigned member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Due date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
}

/// Editable content of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectContent {
    /// Project title
    pub title: String,
    /// Free-form description
    #[serde(default)]
    pub description: String,
    /// Tasks in display order
    #[serde(default)]
    pub tasks: Vec<TaskItem>,
}

/// A project as seen by the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Project id
    pub id: String,
    /// Project content
    #[serde(flatten)]
    pub content: SubjectContent,
    /// Changes on every mutation
    pub revision: u64,
}

/// Read access to subjects
#[async_trait]
pub trait SubjectSource: Send + Sync {
    /// Fetch a subject by id; `None` when it does not exist.
    async fn fetch(&self, subject_id: &str) -> Option<Subject>;
}

/// In-process subject store
#[derive(Debug, Default)]
pub struct InMemorySubjectStore {
    subjects: DashMap<String, Subject>,
}

impl InMemorySubjectStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a subject's content, bumping its revision.
    pub fn upsert(&self, subject_id: &str, content: SubjectContent) -> Subject {
        let mut entry = self
            .subjects
            .entry(subject_id.to_string())
            .or_insert_with(|| Subject {
                id: subject_id.to_string(),
                content: SubjectContent::default(),
                revision: 0,
            });
        entry.content = content;
        entry.revision += 1;
        entry.clone()
    }

    /// Remove a subject
    pub fn remove(&self, subject_id: &str) -> Option<Subject> {
        self.subjects.remove(subject_id).map(|(_, s)| s)
    }

    /// Number of stored subjects
    #[must_use]
    pub fn len(&self) -> usize {
        self.subjects.len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }
}

#[async_trait]
impl SubjectSource for InMemorySubjectStore {
    async fn fetch(&self, subject_id: &str) -> Option<Subject> {
        self.subjects.get(subject_id).map(|s| s.clone())
    }
}
