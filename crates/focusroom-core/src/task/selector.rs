//! Deterministic ranking of task candidates.
//!
//! Order, most important first:
//!
//! 1. priority level (high > medium > low; unrecognized counts as medium)
//! 2. has a due date, then the nearer due date
//! 3. more subtasks
//! 4. more recently created
//!
//! Remaining ties keep their input order.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityLevel {
    Low,
    Medium,
    High,
}

impl PriorityLevel {
    /// Lenient parse of a stored priority label.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => PriorityLevel::High,
            "low" => PriorityLevel::Low,
            _ => PriorityLevel::Medium,
        }
    }
}

/// Snapshot of a task as seen at session start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCandidate {
    pub id: String,
    pub title: String,
    /// Free-form label as stored by the task source ("High", "medium", ...).
    #[serde(default)]
    pub priority_level: String,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub subtask_count: u32,
    pub created_at: DateTime<Utc>,
}

impl TaskCandidate {
    pub fn priority(&self) -> PriorityLevel {
        PriorityLevel::from_label(&self.priority_level)
    }
}

/// The task a session was started for. Frozen for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusedTask {
    pub id: String,
    pub title: String,
}

impl From<&TaskCandidate> for FocusedTask {
    fn from(c: &TaskCandidate) -> Self {
        FocusedTask {
            id: c.id.clone(),
            title: c.title.clone(),
        }
    }
}

/// How the focused task is picked at start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskSelection {
    /// Rank the snapshot and take the top candidate.
    Automatic(Vec<TaskCandidate>),
    /// Caller-ordered list; the first entry is used as-is.
    Manual(Vec<TaskCandidate>),
    None,
}

impl TaskSelection {
    pub fn resolve(&self) -> Option<FocusedTask> {
        match self {
            TaskSelection::Automatic(candidates) => select(candidates).map(FocusedTask::from),
            TaskSelection::Manual(ordered) => ordered.first().map(FocusedTask::from),
            TaskSelection::None => None,
        }
    }
}

fn compare(a: &TaskCandidate, b: &TaskCandidate) -> Ordering {
    b.priority()
        .cmp(&a.priority())
        .then_with(|| match (a.due_date, b.due_date) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.subtask_count.cmp(&a.subtask_count))
        .then_with(|| b.created_at.cmp(&a.created_at))
}

/// Candidates ordered best first.
pub fn rank(candidates: &[TaskCandidate]) -> Vec<&TaskCandidate> {
    let mut ranked: Vec<&TaskCandidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| compare(a, b));
    ranked
}

/// Top-ranked candidate, if any.
pub fn select(candidates: &[TaskCandidate]) -> Option<&TaskCandidate> {
    candidates
        .iter()
        .reduce(|best, c| if compare(c, best) == Ordering::Less { c } else { best })
}
