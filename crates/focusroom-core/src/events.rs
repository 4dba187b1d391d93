use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::playback::{SoundCategory, Track};
use crate::session::{CompletionReason, ReportSource, SessionStatus, SessionSummary};
use crate::task::FocusedTask;

/// Every session state change produces an Event.
/// The CLI prints them; a UI can poll `snapshot()` for the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: String,
        planned_seconds: u64,
        focused_task: Option<FocusedTask>,
        sound: Option<SoundCategory>,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// Process is about to be suspended by the host.
    SessionSuspended {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// Elapsed wall-clock time was applied after a suspension or restart.
    SessionRecovered {
        gap_ms: u64,
        remaining_ms: u64,
        completed: bool,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: String,
        reason: CompletionReason,
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    SessionCancelled {
        session_id: String,
        elapsed_seconds: u64,
        at: DateTime<Utc>,
    },
    SessionReported {
        summary: SessionSummary,
        source: ReportSource,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    AutoAdvanceChanged {
        enabled: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        status: SessionStatus,
        session_id: Option<String>,
        planned_seconds: u64,
        remaining_seconds: u64,
        focused_task: Option<FocusedTask>,
        current_track: Option<Track>,
        is_playing: bool,
        is_preview_mode: bool,
        at: DateTime<Utc>,
    },
}
