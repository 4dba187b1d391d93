use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::timekeeper::TimeKeeper;
use crate::playback::{SoundCategory, Track};
use crate::task::FocusedTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Active,
    Paused,
    /// Countdown over or ended by the user; waiting to be reported.
    Completing,
    Cancelled,
    Done,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Active => "active",
            SessionStatus::Paused => "paused",
            SessionStatus::Completing => "completing",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Done => "done",
        };
        f.write_str(s)
    }
}

/// Why a session left the running states towards `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    TimeUp,
    UserEnded,
}

/// One timed focus interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub status: SessionStatus,
    pub planned_seconds: u64,
    pub timer: TimeKeeper,
    #[serde(default)]
    pub focused_task: Option<FocusedTask>,
    /// Category the playlist was started with, if sound was on.
    #[serde(default)]
    pub sound: Option<SoundCategory>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Set once the result has been handed to a reporter.
    #[serde(default)]
    pub reported: bool,
}

impl Session {
    pub(crate) fn begin(
        planned_seconds: u64,
        focused_task: Option<FocusedTask>,
        sound: Option<SoundCategory>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut timer = TimeKeeper::new(planned_seconds * 1000);
        timer.anchor_at(now);
        Self {
            id: Uuid::new_v4().to_string(),
            status: SessionStatus::Active,
            planned_seconds,
            timer,
            focused_task,
            sound,
            started_at: now,
            ended_at: None,
            reported: false,
        }
    }

    pub fn remaining_ms(&self) -> u64 {
        self.timer.remaining_ms()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.timer.remaining_seconds()
    }

    /// Focus time actually consumed, in whole seconds.
    pub fn elapsed_seconds(&self) -> u64 {
        (self.planned_seconds * 1000).saturating_sub(self.timer.remaining_ms()) / 1000
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, SessionStatus::Active | SessionStatus::Paused)
    }
}

/// What a UI renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionView {
    pub remaining_seconds: u64,
    pub status: SessionStatus,
    pub current_track: Option<Track>,
    pub is_playing: bool,
    pub is_preview_mode: bool,
}
