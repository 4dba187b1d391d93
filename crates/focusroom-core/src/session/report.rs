//! Session result reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::model::{Session, SessionStatus};
use crate::error::PersistenceError;
use crate::playback::SoundCategory;

/// Outcome of one session, handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub planned_seconds: u64,
    /// Focus time actually elapsed.
    pub elapsed_seconds: u64,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub task_title: Option<String>,
    pub completed: bool,
    #[serde(default)]
    pub sound: Option<SoundCategory>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Summary built purely from local session state.
    pub fn from_session(session: &Session, ended_at: DateTime<Utc>) -> Self {
        Self {
            session_id: session.id.clone(),
            planned_seconds: session.planned_seconds,
            elapsed_seconds: session.elapsed_seconds(),
            task_id: session.focused_task.as_ref().map(|t| t.id.clone()),
            task_title: session.focused_task.as_ref().map(|t| t.title.clone()),
            completed: session.status != SessionStatus::Cancelled,
            sound: session.sound,
            started_at: session.started_at,
            ended_at: session.ended_at.unwrap_or(ended_at),
        }
    }

    pub fn elapsed_minutes(&self) -> u64 {
        self.elapsed_seconds / 60
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    /// Accepted by the persistence collaborator.
    Submitted,
    /// Submission failed; the summary exists only locally.
    LocalFallback,
}

/// External "submit session result" collaborator.
pub trait SessionReporter {
    fn submit_session_result(&self, summary: &SessionSummary) -> Result<(), PersistenceError>;
}

/// Accepts and discards every summary.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardReporter;

impl SessionReporter for DiscardReporter {
    fn submit_session_result(&self, _summary: &SessionSummary) -> Result<(), PersistenceError> {
        Ok(())
    }
}
