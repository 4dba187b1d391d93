//! Session state machine.
//!
//! Like the timer it grew out of, the controller has no thread of its own:
//! the host calls [`SessionController::tick`] about once a second and
//! forwards suspend/resume signals. Time is read only through [`Clock`].
//!
//! ```text
//! Idle -> Active <-> Paused
//! Active -> Completing (time up)        -> Done      -> Idle (reset)
//! Active | Paused -> Completing (end)   -> Done
//! Active | Paused -> Cancelled          -> Idle (reset)
//! ```
//!
//! Sound is commanded through [`SoundControl`] and never consulted for
//! timing; a stalled or failing audio path cannot delay a completion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::model::{CompletionReason, Session, SessionStatus, SessionView};
use super::report::{ReportSource, SessionReporter, SessionSummary};
use crate::clock::Clock;
use crate::error::ValidationError;
use crate::events::Event;
use crate::playback::{SoundCategory, SoundControl};
use crate::task::TaskSelection;

pub const MIN_FOCUS_MINUTES: u32 = 1;
pub const MAX_FOCUS_MINUTES: u32 = 180;

pub struct SessionController {
    clock: Arc<dyn Clock>,
    sound: Arc<dyn SoundControl>,
    /// Playlist category for new sessions; `None` means sound off.
    sound_category: Option<SoundCategory>,
    session: Option<Session>,
    suspended_at: Option<DateTime<Utc>>,
    last_summary: Option<(SessionSummary, ReportSource)>,
}

impl SessionController {
    pub fn new(clock: Arc<dyn Clock>, sound: Arc<dyn SoundControl>) -> Self {
        Self {
            clock,
            sound,
            sound_category: None,
            session: None,
            suspended_at: None,
            last_summary: None,
        }
    }

    /// Enable background sound for sessions started from now on.
    pub fn with_sound(mut self, category: Option<SoundCategory>) -> Self {
        self.set_sound(category);
        self
    }

    pub fn set_sound(&mut self, category: Option<SoundCategory>) {
        self.sound_category = category.filter(|c| c.is_audible());
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.session
            .as_ref()
            .map(|s| s.status)
            .unwrap_or(SessionStatus::Idle)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.session
            .as_ref()
            .map(|s| s.remaining_seconds())
            .unwrap_or(0)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended_at.is_some()
    }

    /// Summary from the most recent `report`.
    pub fn last_summary(&self) -> Option<&(SessionSummary, ReportSource)> {
        self.last_summary.as_ref()
    }

    pub fn view(&self) -> SessionView {
        let (current_track, is_playing, is_preview_mode) = self.sound.now_playing();
        SessionView {
            remaining_seconds: self.remaining_seconds(),
            status: self.status(),
            current_track,
            is_playing,
            is_preview_mode,
        }
    }

    pub fn snapshot(&self) -> Event {
        let view = self.view();
        let session = self.session.as_ref();
        Event::StateSnapshot {
            status: view.status,
            session_id: session.map(|s| s.id.clone()),
            planned_seconds: session.map(|s| s.planned_seconds).unwrap_or(0),
            remaining_seconds: view.remaining_seconds,
            focused_task: session.and_then(|s| s.focused_task.clone()),
            current_track: view.current_track,
            is_playing: view.is_playing,
            is_preview_mode: view.is_preview_mode,
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a new session of `minutes`. Rejected without any state change
    /// if the duration is out of range or a session is still in progress.
    pub fn start(&mut self, minutes: u32, tasks: &TaskSelection) -> Result<Event, ValidationError> {
        if !(MIN_FOCUS_MINUTES..=MAX_FOCUS_MINUTES).contains(&minutes) {
            return Err(ValidationError::DurationOutOfRange {
                minutes,
                min: MIN_FOCUS_MINUTES,
                max: MAX_FOCUS_MINUTES,
            });
        }
        let status = self.status();
        if !matches!(
            status,
            SessionStatus::Idle | SessionStatus::Done | SessionStatus::Cancelled
        ) {
            return Err(ValidationError::InvalidState {
                action: "start a session",
                status: status.to_string(),
            });
        }

        let now = self.clock.now();
        let focused_task = tasks.resolve();
        let session = Session::begin(
            u64::from(minutes) * 60,
            focused_task.clone(),
            self.sound_category,
            now,
        );
        let event = Event::SessionStarted {
            session_id: session.id.clone(),
            planned_seconds: session.planned_seconds,
            focused_task,
            sound: session.sound,
            at: now,
        };
        info!(session = %session.id, minutes, task = ?session.focused_task.as_ref().map(|t| &t.title), "session started");
        self.session = Some(session);
        self.suspended_at = None;

        if let Some(category) = self.sound_category {
            self.sound.stop_preview();
            self.sound.start_playlist(category);
        }
        Ok(event)
    }

    pub fn pause(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self.session.as_mut()?;
        if session.status != SessionStatus::Active {
            return None;
        }
        session.timer.freeze(now);
        let completed = session.timer.remaining_ms() == 0;
        if completed {
            // Time ran out before the pause arrived.
            return self.complete(CompletionReason::TimeUp, now);
        }
        session.status = SessionStatus::Paused;
        let remaining_ms = session.timer.remaining_ms();
        debug!(remaining_ms, "session paused");
        self.sound.pause();
        Some(Event::SessionPaused {
            remaining_ms,
            at: now,
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self.session.as_mut()?;
        if session.status != SessionStatus::Paused {
            return None;
        }
        session.status = SessionStatus::Active;
        session.timer.anchor_at(now);
        let remaining_ms = session.timer.remaining_ms();
        debug!(remaining_ms, "session resumed");
        self.sound.resume();
        Some(Event::SessionResumed {
            remaining_ms,
            at: now,
        })
    }

    /// 1 Hz heartbeat. Returns `SessionCompleted` on the zero crossing.
    pub fn tick(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self.session.as_mut()?;
        if session.status != SessionStatus::Active {
            return None;
        }
        session.timer.flush(now);
        if session.timer.remaining_ms() == 0 {
            return self.complete(CompletionReason::TimeUp, now);
        }
        None
    }

    /// The host is about to suspend the process.
    pub fn suspend(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.suspended_at = Some(now);
        let session = self.session.as_ref()?;
        debug!(status = %session.status, "suspending");
        Some(Event::SessionSuspended {
            remaining_ms: session.timer.remaining_ms(),
            at: now,
        })
    }

    /// The host resumed the process. Applies the time since the last anchor
    /// once; a paused session is left untouched.
    pub fn resume_from_suspend(&mut self) -> Option<Event> {
        let suspended_at = self.suspended_at.take();
        let now = self.clock.now();
        if let Some(since) = suspended_at {
            debug!(
                suspended_ms = now.signed_duration_since(since).num_milliseconds(),
                "process resumed"
            );
        }
        self.recover(now)
    }

    /// Install a previously persisted session, e.g. after a restart. An
    /// active session is caught up as if the process had been suspended
    /// since its last anchor.
    pub fn restore(&mut self, session: Session) -> Option<Event> {
        debug!(session = %session.id, status = %session.status, "restoring session");
        self.session = Some(session);
        self.suspended_at = None;
        let now = self.clock.now();
        self.recover(now)
    }

    fn recover(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let session = self.session.as_mut()?;
        if session.status != SessionStatus::Active {
            return None;
        }
        let gap_ms = session.timer.pending_ms(now);
        session.timer.flush(now);
        let remaining_ms = session.timer.remaining_ms();
        info!(gap_ms, remaining_ms, "session recovered");
        let completed = remaining_ms == 0;
        if completed {
            self.complete(CompletionReason::TimeUp, now);
        }
        Some(Event::SessionRecovered {
            gap_ms,
            remaining_ms,
            completed,
            at: now,
        })
    }

    pub fn user_end(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self.session.as_mut()?;
        if !session.is_running() {
            return None;
        }
        session.timer.freeze(now);
        self.complete(CompletionReason::UserEnded, now)
    }

    pub fn user_cancel(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self.session.as_mut()?;
        if !session.is_running() {
            return None;
        }
        session.status = SessionStatus::Cancelled;
        session.timer.freeze(now);
        session.ended_at = Some(now);
        self.sound.stop();
        let elapsed_seconds = session.elapsed_seconds();
        info!(session = %session.id, elapsed_seconds, "session cancelled");
        Some(Event::SessionCancelled {
            session_id: session.id.clone(),
            elapsed_seconds,
            at: now,
        })
    }

    /// Single exit from the running states towards `Done`. Acts only while
    /// Active or Paused and leaves those states before anything else.
    fn complete(&mut self, reason: CompletionReason, now: DateTime<Utc>) -> Option<Event> {
        let session = self.session.as_mut()?;
        if !session.is_running() {
            return None;
        }
        session.status = SessionStatus::Completing;
        session.timer.freeze(now);
        session.ended_at = Some(now);
        self.sound.stop();
        let elapsed_seconds = session.elapsed_seconds();
        info!(session = %session.id, ?reason, elapsed_seconds, "session completed");
        Some(Event::SessionCompleted {
            session_id: session.id.clone(),
            reason,
            elapsed_seconds,
            at: now,
        })
    }

    /// Submit the finished session, once. A completing session moves to
    /// `Done` whether or not the submission succeeds; a cancelled one stays
    /// cancelled.
    pub fn report(&mut self, reporter: &dyn SessionReporter) -> Option<Event> {
        let now = self.clock.now();
        let session = self.session.as_mut()?;
        if session.reported
            || !matches!(
                session.status,
                SessionStatus::Completing | SessionStatus::Cancelled
            )
        {
            return None;
        }
        let summary = SessionSummary::from_session(session, now);
        session.reported = true;
        if session.status == SessionStatus::Completing {
            session.status = SessionStatus::Done;
        }
        let source = match reporter.submit_session_result(&summary) {
            Ok(()) => ReportSource::Submitted,
            Err(e) => {
                warn!(session = %summary.session_id, error = %e, "report failed; keeping local summary");
                ReportSource::LocalFallback
            }
        };
        self.last_summary = Some((summary.clone(), source));
        Some(Event::SessionReported {
            summary,
            source,
            at: now,
        })
    }

    /// Back to Idle from Done or Cancelled.
    pub fn reset(&mut self) -> Option<Event> {
        if !matches!(
            self.status(),
            SessionStatus::Done | SessionStatus::Cancelled
        ) {
            return None;
        }
        self.session = None;
        Some(Event::SessionReset {
            at: self.clock.now(),
        })
    }

    /// The playback view became active: tracks may advance on their own.
    pub fn enter_scope(&mut self) -> Event {
        self.sound.set_auto_advance(true);
        Event::AutoAdvanceChanged {
            enabled: true,
            at: self.clock.now(),
        }
    }

    pub fn exit_scope(&mut self) -> Event {
        self.sound.set_auto_advance(false);
        Event::AutoAdvanceChanged {
            enabled: false,
            at: self.clock.now(),
        }
    }
}
