//! Session controller timing, suspension recovery and its coupling to
//! playback.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use focusroom_core::{
    BundledCatalog, Event, ManualClock, MemoryBackend, NoSound, PlaybackEngine, PlaybackSettings,
    Session, SessionController, SessionStatus, SoundCategory, TaskCandidate, TaskSelection,
    ValidationError,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap())
}

fn silent(clock: &ManualClock) -> SessionController {
    SessionController::new(Arc::new(clock.clone()), Arc::new(NoSound))
}

fn candidate(id: &str, priority: &str, subtasks: u32) -> TaskCandidate {
    TaskCandidate {
        id: id.into(),
        title: format!("Task {id}"),
        priority_level: priority.into(),
        due_date: None,
        subtask_count: subtasks,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
    }
}

// ============================================================================
// Suspension recovery
// ============================================================================

#[test]
fn suspension_subtracts_the_gap_once() {
    let clock = clock();
    let mut ctl = silent(&clock);
    ctl.start(25, &TaskSelection::None).unwrap();

    clock.advance_secs(100);
    ctl.tick();
    assert_eq!(ctl.remaining_seconds(), 1400);

    ctl.suspend();
    clock.advance_secs(600);
    match ctl.resume_from_suspend() {
        Some(Event::SessionRecovered {
            gap_ms,
            remaining_ms,
            completed,
            ..
        }) => {
            assert_eq!(gap_ms, 600_000);
            assert_eq!(remaining_ms, 800_000);
            assert!(!completed);
        }
        other => panic!("unexpected event {other:?}"),
    }

    // A tick that lands in the same window finds nothing left to subtract.
    ctl.tick();
    assert_eq!(ctl.remaining_seconds(), 800);
}

#[test]
fn ticks_during_suspension_do_not_double_count() {
    let clock = clock();
    let mut ctl = silent(&clock);
    ctl.start(25, &TaskSelection::None).unwrap();

    ctl.suspend();
    clock.advance_secs(200);
    ctl.tick();
    clock.advance_secs(100);
    ctl.resume_from_suspend();

    assert_eq!(ctl.remaining_seconds(), 1200);
}

#[test]
fn paused_session_survives_suspension_unchanged() {
    let clock = clock();
    let mut ctl = silent(&clock);
    ctl.start(25, &TaskSelection::None).unwrap();
    clock.advance_secs(300);
    ctl.pause().unwrap();
    assert_eq!(ctl.remaining_seconds(), 1200);

    ctl.suspend();
    clock.advance_secs(600);
    assert!(ctl.resume_from_suspend().is_none());
    assert_eq!(ctl.remaining_seconds(), 1200);
    assert_eq!(ctl.status(), SessionStatus::Paused);
}

#[test]
fn long_suspension_completes_exactly_once() {
    let clock = clock();
    let mut ctl = silent(&clock);
    ctl.start(5, &TaskSelection::None).unwrap();

    ctl.suspend();
    clock.advance_secs(3600);
    match ctl.resume_from_suspend() {
        Some(Event::SessionRecovered { completed, remaining_ms, .. }) => {
            assert!(completed);
            assert_eq!(remaining_ms, 0);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(ctl.status(), SessionStatus::Completing);
    assert!(ctl.tick().is_none());
    assert!(ctl.resume_from_suspend().is_none());
    assert_eq!(ctl.session().unwrap().elapsed_seconds(), 300);
}

#[test]
fn restore_catches_up_an_active_session() {
    let clock = clock();
    let mut first = silent(&clock);
    first.start(25, &TaskSelection::None).unwrap();
    clock.advance_secs(60);
    first.tick();

    let saved = serde_json::to_string(first.session().unwrap()).unwrap();
    drop(first);

    clock.advance_secs(240);
    let mut second = silent(&clock);
    let session: Session = serde_json::from_str(&saved).unwrap();
    let event = second.restore(session);
    assert!(matches!(event, Some(Event::SessionRecovered { gap_ms: 240_000, .. })));
    assert_eq!(second.remaining_seconds(), 1200);
    assert_eq!(second.status(), SessionStatus::Active);
}

#[test]
fn sub_second_ticks_do_not_lose_time() {
    let clock = clock();
    let mut ctl = silent(&clock);
    ctl.start(1, &TaskSelection::None).unwrap();
    for _ in 0..100 {
        clock.advance_ms(400);
        ctl.tick();
    }
    assert_eq!(ctl.session().unwrap().remaining_ms(), 20_000);
    assert_eq!(ctl.remaining_seconds(), 20);
}

// ============================================================================
// Validation and task selection
// ============================================================================

#[test]
fn invalid_duration_leaves_running_session_untouched() {
    let clock = clock();
    let mut ctl = silent(&clock);
    ctl.start(25, &TaskSelection::None).unwrap();
    clock.advance_secs(10);
    ctl.tick();
    let before = ctl.session().cloned();

    for minutes in [0, 181] {
        let err = ctl.start(minutes, &TaskSelection::None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DurationOutOfRange {
                minutes,
                min: 1,
                max: 180
            }
        );
    }
    assert_eq!(ctl.session().cloned(), before);
}

#[test]
fn focused_task_is_frozen_at_start() {
    let clock = clock();
    let mut ctl = silent(&clock);
    let mut tasks = vec![candidate("a", "Low", 0), candidate("b", "High", 0)];
    ctl.start(25, &TaskSelection::Automatic(tasks.clone())).unwrap();
    assert_eq!(ctl.session().unwrap().focused_task.as_ref().unwrap().id, "b");

    // The source list changing afterwards does not matter.
    tasks.clear();
    clock.advance_secs(30);
    ctl.tick();
    assert_eq!(ctl.session().unwrap().focused_task.as_ref().unwrap().id, "b");
}

#[test]
fn manual_selection_bypasses_ranking() {
    let clock = clock();
    let mut ctl = silent(&clock);
    let tasks = vec![candidate("a", "Low", 0), candidate("b", "High", 9)];
    ctl.start(25, &TaskSelection::Manual(tasks)).unwrap();
    assert_eq!(ctl.session().unwrap().focused_task.as_ref().unwrap().id, "a");
}

// ============================================================================
// Sound coupling
// ============================================================================

fn sound_engine(load_delay: Duration) -> PlaybackEngine<MemoryBackend> {
    PlaybackEngine::new(
        MemoryBackend::new().with_load_delay(load_delay),
        Arc::new(BundledCatalog::new("/music")),
        PlaybackSettings::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn start_drives_playlist_and_end_silences_it() {
    let clock = clock();
    let engine = sound_engine(Duration::ZERO);
    let mut ctl = SessionController::new(Arc::new(clock.clone()), Arc::new(engine.clone()))
        .with_sound(Some(SoundCategory::LoFi));

    ctl.start(25, &TaskSelection::None).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    let view = ctl.view();
    assert!(view.is_playing);
    assert_eq!(view.current_track.unwrap().display_name, "Biscuit - Lukrembo");

    ctl.user_end().unwrap();
    let view = ctl.view();
    assert_eq!(view.status, SessionStatus::Completing);
    assert!(!view.is_playing);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert!(engine.backend().loaded_handles().is_empty());
    assert!(engine.backend().playing_handles().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_audio_never_delays_completion() {
    let clock = clock();
    let engine = sound_engine(Duration::from_secs(30));
    let mut ctl = SessionController::new(Arc::new(clock.clone()), Arc::new(engine.clone()))
        .with_sound(Some(SoundCategory::Classical));

    ctl.start(1, &TaskSelection::None).unwrap();
    clock.advance_secs(61);
    assert!(matches!(ctl.tick(), Some(Event::SessionCompleted { .. })));

    // The load that was still in flight is discarded when it lands.
    tokio::time::sleep(Duration::from_secs(40)).await;
    assert!(engine.backend().loaded_handles().is_empty());
    assert!(!ctl.view().is_playing);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_pause_never_resumes_audio() {
    let clock = clock();
    let engine = sound_engine(Duration::ZERO);
    let mut ctl = SessionController::new(Arc::new(clock.clone()), Arc::new(engine.clone()))
        .with_sound(Some(SoundCategory::Ambient));

    ctl.enter_scope();
    ctl.start(25, &TaskSelection::None).unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    ctl.pause().unwrap();
    ctl.resume().unwrap();
    ctl.user_cancel().unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(engine.backend().playing_handles().is_empty());
    assert!(engine.backend().loaded_handles().is_empty());
    assert_eq!(ctl.status(), SessionStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn scope_controls_auto_advance() {
    let clock = clock();
    let engine = sound_engine(Duration::ZERO);
    let mut ctl = SessionController::new(Arc::new(clock), Arc::new(engine.clone()));

    assert!(!engine.snapshot().auto_advance);
    ctl.enter_scope();
    assert!(engine.snapshot().auto_advance);
    ctl.exit_scope();
    assert!(!engine.snapshot().auto_advance);
}

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    Wait(i64),
    Tick,
    Pause,
    Resume,
    Suspend,
    Wake,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0i64..120_000).prop_map(Step::Wait),
        Just(Step::Tick),
        Just(Step::Pause),
        Just(Step::Resume),
        Just(Step::Suspend),
        Just(Step::Wake),
    ]
}

proptest! {
    #[test]
    fn remaining_never_increases_and_freezes_while_paused(steps in prop::collection::vec(step(), 1..60)) {
        let clock = clock();
        let mut ctl = silent(&clock);
        ctl.start(30, &TaskSelection::None).unwrap();
        let mut last = ctl.session().unwrap().remaining_ms();

        for step in steps {
            let status_before = ctl.status();
            match step {
                Step::Wait(ms) => clock.advance_ms(ms),
                Step::Tick => { ctl.tick(); }
                Step::Pause => { ctl.pause(); }
                Step::Resume => { ctl.resume(); }
                Step::Suspend => { ctl.suspend(); }
                Step::Wake => { ctl.resume_from_suspend(); }
            }
            let now = ctl.session().unwrap().remaining_ms();
            prop_assert!(now <= last);
            if status_before == SessionStatus::Paused {
                prop_assert_eq!(now, last);
            }
            if now == 0 {
                prop_assert!(ctl.status() != SessionStatus::Active);
            }
            last = now;
        }
    }
}
