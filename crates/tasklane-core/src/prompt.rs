//! Prompt construction
//!
//! Renders a subject into plain-text context and wraps it in the summary or
//! question instruction. Context longer than the configured limit is cut on
//! a character boundary and marked as truncated.

use crate::subject::Subject;
use std::fmt::Write;
use tasklane_llm::util::truncate_chars;

/// System instruction sent with every request
pub const SYSTEM_INSTRUCTION: &str = "You are an assistant inside a project management tool. \
Answer only from the project data provided. Be concise and factual. \
If the data does not contain the answer, say so.";

const TRUNCATION_MARKER: &str = "\n[project data truncated]";

/// Render a subject as plain text, capped at `max_chars` characters.
#[must_use]
pub fn render_context(subject: &Subject, max_chars: usize) -> String {
    let content = &subject.content;
    let mut out = String::new();

    let _ = writeln!(out, "Project: {}", content.title);
    if !content.description.trim().is_empty() {
        let _ = writeln!(out, "Description: {}", content.description.trim());
    }

    if content.tasks.is_empty() {
        out.push_str("Tasks: none\n");
    } else {
        let _ = writeln!(out, "Tasks ({}):", content.tasks.len());
        for task in &content.tasks {
            let _ = write!(out, "- [{}] {}", task.status, task.title);
            if let Some(assignee) = &task.assignee {
                let _ = write!(out, " (assignee: {assignee})");
            }
            if let Some(due) = task.due {
                let _ = write!(out, " (due: {due})");
            }
            out.push('\n');
        }
    }

    if out.chars().count() > max_chars {
        let mut cut = truncate_chars(&out, max_chars).to_string();
        cut.push_str(TRUNCATION_MARKER);
        cut
    } else {
        out
    }
}

/// Prompt asking for a project summary
#[must_use]
pub fn summary_prompt(subject: &Subject, max_context_chars: usize) -> String {
    format!(
        "{}\nSummarize this project's status in a short paragraph, then list \
         overdue or blocked tasks and who owns them.",
        render_context(subject, max_context_chars)
    )
}

/// Prompt asking a question about a project
#[must_use]
pub fn question_prompt(subject: &Subject, question: &str, max_context_chars: usize) -> String {
    format!(
        "{}\nQuestion: {}",
        render_context(subject, max_context_chars),
        question.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::{SubjectContent, TaskItem, TaskStatus};
    use chrono::NaiveDate;

    fn subject(tasks: usize) -> Subject {
        Subject {
            id: "p1".to_string(),
            content: SubjectContent {
                title: "Website relaunch".to_string(),
                description: "New marketing site".to_string(),
                tasks: (0..tasks)
                    .map(|i| TaskItem {
                        title: format!("Task {i}"),
                        status: TaskStatus::Blocked,
                        assignee: Some("jo".to_string()),
                        due: NaiveDate::from_ymd_opt(2026, 1, 15),
                    })
                    .collect(),
            },
            revision: 1,
        }
    }

    #[test]
    fn test_render_context() {
        let text = render_context(&subject(1), 10_000);
        assert!(text.starts_with("Project: Website relaunch\n"));
        assert!(text.contains("Description: New marketing site"));
        assert!(text.contains("- [blocked] Task 0 (assignee: jo) (due: 2026-01-15)"));
    }

    #[test]
    fn test_empty_task_list() {
        assert!(render_context(&subject(0), 10_000).contains("Tasks: none"));
    }

    #[test]
    fn test_context_is_truncated() {
        let text = render_context(&subject(500), 200);
        assert!(text.ends_with(TRUNCATION_MARKER));
        assert_eq!(text.chars().count(), 200 + TRUNCATION_MARKER.chars().count());
    }

    #[test]
    fn test_question_prompt_includes_question() {
        let prompt = question_prompt(&subject(2), "  Who is blocked? ", 10_000);
        assert!(prompt.ends_with("Question: Who is blocked?"));
        assert!(summary_prompt(&subject(2), 10_000).contains("Summarize"));
    }
}
