//! Playback engine behavior under interleaved commands and completions.
//!
//! All tests run on a paused Tokio clock, so fades, load latency and the
//! preview window elapse in virtual time.

use std::sync::Arc;
use std::time::Duration;

use focusroom_core::playback::{AudioEvent, HandleStatus};
use focusroom_core::{
    AudioBackend, MemoryBackend, PlaybackEngine, PlaybackSettings, PlaylistStart, PreviewStart,
    SoundCategory, Track, TrackCatalog,
};

// ============================================================================
// Test Helpers
// ============================================================================

/// Fixed catalog: Ambient resolves to A, B, C; Nature to a single track;
/// everything else is empty.
struct StaticCatalog;

fn track(name: &str, category: SoundCategory) -> Track {
    Track {
        id: format!("{category}-{name}"),
        display_name: name.to_string(),
        category,
        source_locator: format!("{name}.mp3"),
    }
}

impl TrackCatalog for StaticCatalog {
    fn resolve_tracks(&self, category: SoundCategory) -> Vec<Track> {
        match category {
            SoundCategory::Ambient => ["A", "B", "C"]
                .iter()
                .map(|n| track(n, category))
                .collect(),
            SoundCategory::Nature => vec![track("Forest", category)],
            _ => Vec::new(),
        }
    }
}

fn engine_with(backend: MemoryBackend) -> PlaybackEngine<MemoryBackend> {
    PlaybackEngine::new(backend, Arc::new(StaticCatalog), PlaybackSettings::default())
}

fn engine() -> PlaybackEngine<MemoryBackend> {
    engine_with(MemoryBackend::new())
}

fn current_name(engine: &PlaybackEngine<MemoryBackend>) -> Option<String> {
    engine.snapshot().current_track.map(|t| t.display_name)
}

async fn status(engine: &PlaybackEngine<MemoryBackend>) -> HandleStatus {
    let handle = engine.primary_handle().expect("primary handle");
    engine.backend().status(handle).await.unwrap()
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(3)).await;
}

// ============================================================================
// Playlist start
// ============================================================================

#[tokio::test(start_paused = true)]
async fn start_playlist_plays_first_track_at_target_volume() {
    let engine = engine();
    assert_eq!(
        engine.start_playlist(SoundCategory::Ambient).await,
        PlaylistStart::Started { tracks: 3 }
    );

    let snap = engine.snapshot();
    assert!(snap.is_playing);
    assert_eq!(snap.index, 0);
    assert_eq!(current_name(&engine).as_deref(), Some("A"));
    assert!((status(&engine).await.volume - 0.7).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn empty_category_reports_no_tracks_and_leaves_state_alone() {
    let engine = engine();
    engine.start_playlist(SoundCategory::Ambient).await;
    let before = engine.snapshot();

    assert_eq!(
        engine.start_playlist(SoundCategory::Classical).await,
        PlaylistStart::NoTracks
    );
    assert_eq!(engine.snapshot(), before);
    assert_eq!(engine.backend().playing_handles().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn load_failure_leaves_nothing_playing() {
    let backend = MemoryBackend::new();
    backend.fail_all_loads(true);
    let engine = engine_with(backend);

    assert_eq!(
        engine.start_playlist(SoundCategory::Ambient).await,
        PlaylistStart::Unavailable
    );
    let snap = engine.snapshot();
    assert!(!snap.is_playing);
    assert_eq!(snap.current_track, None);
    assert!(engine.backend().loaded_handles().is_empty());
}

#[tokio::test(start_paused = true)]
async fn play_failure_releases_handle_and_returns_to_idle() {
    let engine = engine();
    engine.backend().fail_plays(true);

    assert_eq!(
        engine.start_playlist(SoundCategory::Ambient).await,
        PlaylistStart::Unavailable
    );
    let snap = engine.snapshot();
    assert!(!snap.is_playing);
    assert_eq!(snap.current_track, None);
    assert_eq!(snap.playlist_len, 0);
    assert_eq!(engine.primary_handle(), None);
    assert!(engine.backend().loaded_handles().is_empty());

    // Nothing is left behind for a resume to pick up.
    engine.backend().fail_plays(false);
    engine.resume().await;
    assert!(engine.backend().playing_handles().is_empty());
    assert!(!engine.snapshot().is_playing);

    // And the failed start does not block a preview.
    assert!(matches!(
        engine.preview_track(SoundCategory::Nature).await,
        PreviewStart::Playing(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn load_failure_does_not_block_preview() {
    let backend = MemoryBackend::new();
    backend.fail_loads_for("A.mp3");
    let engine = engine_with(backend);

    assert_eq!(
        engine.start_playlist(SoundCategory::Ambient).await,
        PlaylistStart::Unavailable
    );
    assert_eq!(engine.snapshot().playlist_len, 0);
    assert!(matches!(
        engine.preview_track(SoundCategory::Nature).await,
        PreviewStart::Playing(_)
    ));
}

// ============================================================================
// Auto-advance
// ============================================================================

#[tokio::test(start_paused = true)]
async fn natural_completion_wraps_to_first_track() {
    let engine = engine();
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;
    assert!(engine.next_track().await);
    assert!(engine.next_track().await);
    assert_eq!(engine.snapshot().index, 2);
    assert_eq!(current_name(&engine).as_deref(), Some("C"));

    let handle = engine.primary_handle().unwrap();
    let event = engine.backend().finish(handle).unwrap();
    assert!(engine.handle_event(event).await);

    let snap = engine.snapshot();
    assert_eq!(snap.index, 0);
    assert!(snap.is_playing);
    assert_eq!(current_name(&engine).as_deref(), Some("A"));
    assert_eq!(engine.backend().loaded_handles().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_advance_is_off_by_default() {
    let engine = engine();
    engine.start_playlist(SoundCategory::Ambient).await;
    let handle = engine.primary_handle().unwrap();
    let event = engine.backend().finish(handle).unwrap();

    assert!(!engine.handle_event(event).await);
    assert_eq!(engine.snapshot().index, 0);
    assert!(!engine.snapshot().is_playing);
}

#[tokio::test(start_paused = true)]
async fn disabling_auto_advance_before_delivery_prevents_advance() {
    let engine = engine();
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;
    let handle = engine.primary_handle().unwrap();

    let event = engine.backend().finish(handle).unwrap();
    engine.disable_auto_advance();
    assert!(!engine.handle_event(event).await);

    assert_eq!(engine.snapshot().index, 0);
    assert_eq!(engine.primary_handle(), Some(handle));
    assert_eq!(engine.backend().load_history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn completion_while_user_paused_is_ignored() {
    let engine = engine();
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;
    engine.pause().await;
    let handle = engine.primary_handle().unwrap();

    let event = engine.backend().finish(handle).unwrap();
    assert!(!engine.handle_event(event).await);
    assert_eq!(engine.snapshot().index, 0);
}

#[tokio::test(start_paused = true)]
async fn completion_from_superseded_handle_is_discarded() {
    let engine = engine();
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;
    let old = engine.primary_handle().unwrap();
    engine.next_track().await;
    assert_eq!(engine.snapshot().index, 1);

    assert!(!engine.on_track_finished(old).await);
    assert_eq!(engine.snapshot().index, 1);
    assert_eq!(current_name(&engine).as_deref(), Some("B"));
}

#[tokio::test(start_paused = true)]
async fn end_of_skipped_track_during_fade_in_does_not_advance_again() {
    let engine = engine();
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;

    // First skip: A fades out, B is installed and still fading in.
    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.next_track().await }
    });
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(current_name(&engine).as_deref(), Some("B"));
    let b = engine.primary_handle().unwrap();

    // Second skip queues behind the fade-in; B ends before it runs.
    let second = tokio::spawn({
        let engine = engine.clone();
        async move { engine.next_track().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(engine.snapshot().index, 2);
    assert_eq!(engine.primary_handle(), None);

    let event = engine.backend().finish(b).unwrap();
    assert!(!engine.handle_event(event).await);

    first.await.unwrap();
    second.await.unwrap();
    settle().await;

    let snap = engine.snapshot();
    assert_eq!(snap.index, 2);
    assert_eq!(current_name(&engine).as_deref(), Some("C"));
    assert!(snap.is_playing);
    assert_eq!(engine.backend().loaded_handles().len(), 1);
    assert_eq!(engine.backend().max_concurrent_playing(), 1);
}

#[tokio::test(start_paused = true)]
async fn events_from_channel_drive_advance() {
    let engine = engine();
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let pump = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run_events(rx).await }
    });

    let handle = engine.primary_handle().unwrap();
    tx.send(AudioEvent::Finished(handle)).unwrap();
    settle().await;
    assert_eq!(current_name(&engine).as_deref(), Some("B"));

    drop(tx);
    pump.await.unwrap();
}

// ============================================================================
// Stop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn stop_during_in_flight_advance_leaves_nothing_audible() {
    let backend = MemoryBackend::new().with_load_delay(Duration::from_millis(300));
    let engine = engine_with(backend);
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;

    let handle = engine.primary_handle().unwrap();
    let event = engine.backend().finish(handle).unwrap();
    let advance = tokio::spawn({
        let engine = engine.clone();
        async move { engine.handle_event(event).await }
    });

    // Past the fade-out, inside the next track's load.
    tokio::time::sleep(Duration::from_millis(650)).await;
    engine.stop().await;
    advance.await.unwrap();
    settle().await;

    let snap = engine.snapshot();
    assert!(!snap.is_playing);
    assert_eq!(snap.current_track, None);
    assert_eq!(snap.playlist_len, 0);
    assert!(engine.backend().loaded_handles().is_empty());
    assert!(engine.backend().max_concurrent_playing() <= 1);
}

#[tokio::test(start_paused = true)]
async fn stop_mid_fade_releases_every_handle() {
    let engine = engine();
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;

    let skip = tokio::spawn({
        let engine = engine.clone();
        async move { engine.next_track().await }
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    engine.stop().await;
    skip.await.unwrap();
    settle().await;

    assert!(engine.backend().loaded_handles().is_empty());
    assert!(!engine.snapshot().is_playing);
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_from_any_state() {
    let engine = engine();
    engine.stop().await;
    engine.stop().await;

    engine.start_playlist(SoundCategory::Ambient).await;
    engine.pause().await;
    engine.stop().await;
    engine.stop().await;
    assert!(engine.backend().loaded_handles().is_empty());

    // A fresh start works after stopping.
    assert_eq!(
        engine.start_playlist(SoundCategory::Nature).await,
        PlaylistStart::Started { tracks: 1 }
    );
    assert!(engine.snapshot().is_playing);
}

#[tokio::test(start_paused = true)]
async fn rapid_skips_never_overlap_audible_handles() {
    let engine = engine();
    engine.start_playlist(SoundCategory::Ambient).await;

    let (a, b, c) = tokio::join!(engine.next_track(), engine.next_track(), engine.next_track());
    assert!(a && b && c);
    settle().await;

    assert_eq!(engine.snapshot().index, 0);
    assert_eq!(current_name(&engine).as_deref(), Some("A"));
    assert_eq!(engine.backend().loaded_handles().len(), 1);
    assert_eq!(engine.backend().max_concurrent_playing(), 1);
}

// ============================================================================
// Pause / resume / skip
// ============================================================================

#[tokio::test(start_paused = true)]
async fn skip_is_a_no_op_while_paused() {
    let engine = engine();
    engine.start_playlist(SoundCategory::Ambient).await;
    engine.pause().await;

    assert!(!engine.next_track().await);
    assert!(!engine.previous_track().await);
    assert_eq!(engine.snapshot().index, 0);
    assert!(engine.backend().playing_handles().is_empty());
}

#[tokio::test(start_paused = true)]
async fn previous_wraps_to_last_track() {
    let engine = engine();
    engine.start_playlist(SoundCategory::Ambient).await;
    assert!(engine.previous_track().await);
    assert_eq!(engine.snapshot().index, 2);
    assert_eq!(current_name(&engine).as_deref(), Some("C"));
}

#[tokio::test(start_paused = true)]
async fn pause_keeps_handle_and_resume_restores_volume() {
    let engine = engine();
    engine.start_playlist(SoundCategory::Ambient).await;
    let handle = engine.primary_handle().unwrap();
    engine.backend().advance(Duration::from_secs(20));

    engine.pause().await;
    assert!(!engine.snapshot().is_playing);
    assert!(engine.backend().is_loaded(handle));
    assert_eq!(engine.backend().volume(handle), Some(0.0));

    engine.resume().await;
    assert_eq!(engine.primary_handle(), Some(handle));
    assert!(engine.snapshot().is_playing);
    assert_eq!(engine.backend().position_ms(handle), Some(20_000));
    assert!((engine.backend().volume(handle).unwrap() - 0.7).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn resume_after_track_ended_while_paused_rewinds_in_place() {
    let engine = engine();
    engine.enable_auto_advance();
    engine.start_playlist(SoundCategory::Ambient).await;
    engine.pause().await;
    let handle = engine.primary_handle().unwrap();

    let event = engine.backend().finish(handle).unwrap();
    assert!(!engine.handle_event(event).await);

    engine.resume().await;
    assert_eq!(engine.primary_handle(), Some(handle));
    assert_eq!(engine.snapshot().index, 0);
    assert_eq!(engine.backend().position_ms(handle), Some(0));
    assert!(engine.backend().is_playing(handle));
}

#[tokio::test(start_paused = true)]
async fn set_volume_clamps_and_applies_to_audible_handle() {
    let engine = engine();
    engine.start_playlist(SoundCategory::Ambient).await;
    let handle = engine.primary_handle().unwrap();

    engine.set_volume(1.7).await;
    assert_eq!(engine.snapshot().volume, 1.0);
    assert_eq!(engine.backend().volume(handle), Some(1.0));

    engine.set_volume(-0.2).await;
    assert_eq!(engine.backend().volume(handle), Some(0.0));
}

// ============================================================================
// Preview
// ============================================================================

#[tokio::test(start_paused = true)]
async fn preview_stops_itself_after_window() {
    let engine = engine();
    match engine.preview_track(SoundCategory::Nature).await {
        PreviewStart::Playing(track) => assert_eq!(track.display_name, "Forest"),
        other => panic!("unexpected preview outcome {other:?}"),
    }
    let snap = engine.snapshot();
    assert!(snap.is_preview_mode);
    assert!(snap.is_playing);
    assert_eq!(snap.playlist_len, 0);

    tokio::time::sleep(PlaybackSettings::default().preview_window + Duration::from_secs(1)).await;

    let snap = engine.snapshot();
    assert!(!snap.is_preview_mode);
    assert!(!snap.is_playing);
    assert_eq!(snap.current_track, None);
    assert!(engine.backend().loaded_handles().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_preview_timer_does_not_end_a_newer_preview() {
    let engine = engine();
    engine.preview_track(SoundCategory::Nature).await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    engine.preview_track(SoundCategory::Ambient).await;

    // First preview's window elapses; the second keeps playing.
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert!(engine.snapshot().is_preview_mode);
    assert_eq!(current_name(&engine).as_deref(), Some("A"));

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!engine.snapshot().is_preview_mode);
}

#[tokio::test(start_paused = true)]
async fn preview_is_refused_while_playlist_is_active() {
    let engine = engine();
    engine.start_playlist(SoundCategory::Ambient).await;
    assert_eq!(
        engine.preview_track(SoundCategory::Nature).await,
        PreviewStart::Busy
    );
    assert!(!engine.snapshot().is_preview_mode);
    assert_eq!(engine.backend().loaded_handles().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn playlist_start_ends_open_preview() {
    let engine = engine();
    engine.preview_track(SoundCategory::Nature).await;
    let preview = engine.preview_handle().unwrap();

    engine.start_playlist(SoundCategory::Ambient).await;
    let snap = engine.snapshot();
    assert!(!snap.is_preview_mode);
    assert_eq!(current_name(&engine).as_deref(), Some("A"));
    assert!(!engine.backend().is_loaded(preview));
    assert_eq!(engine.backend().playing_handles().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn preview_of_empty_category_reports_no_tracks() {
    let engine = engine();
    assert_eq!(
        engine.preview_track(SoundCategory::Silence).await,
        PreviewStart::NoTracks
    );
    assert!(!engine.snapshot().is_preview_mode);
}
