//! Background playlist engine.
//!
//! Owns at most one audible playlist handle at a time and a separate
//! preview handle. All state lives behind a short-lived std mutex that is
//! never held across an await; anything that changes which track is
//! audible runs under the async `transition` lock, one at a time.
//!
//! ## Ordering rules
//!
//! - A handle's completion subscription is dropped (see [`HandleArena`])
//!   before any fade, stop or release step touches it.
//! - `stop` raises the `stopping` flag and bumps the epoch synchronously,
//!   before any awaited teardown. Every transition re-checks the epoch
//!   after each await and backs out if it was superseded.
//! - Completion notices are checked against the current owner, then against
//!   `stopping`, auto-advance and user pause, inside the handler itself.
//!
//! Load failures are logged and leave the engine with nothing playing.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::backend::{AudioBackend, AudioEvent, HandleId};
use super::fade::{fade, PlaybackSettings};
use super::slot::HandleArena;
use super::{SoundCategory, Track};
use crate::catalog::TrackCatalog;

/// Result of asking for a category playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistStart {
    /// First track is playing, or loaded and held because the user paused.
    Started { tracks: usize },
    /// The catalog has nothing for this category; state untouched.
    NoTracks,
    /// The first track could not be loaded; nothing is playing.
    Unavailable,
    /// A stop or another start took over before playback began.
    Interrupted,
}

/// Result of asking for a category preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewStart {
    Playing(Track),
    NoTracks,
    /// A session playlist is active; previews are not mixed with it.
    Busy,
    Unavailable,
    Interrupted,
}

/// Observable playback state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub current_track: Option<Track>,
    pub playlist_len: usize,
    pub index: usize,
    pub is_playing: bool,
    pub is_preview_mode: bool,
    pub user_paused: bool,
    pub auto_advance: bool,
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    Playing,
    Held,
    Failed,
    Superseded,
}

#[derive(Debug)]
struct PlaybackState {
    playlist: Vec<Track>,
    index: usize,
    arena: HandleArena,
    preview: Option<HandleId>,
    current_track: Option<Track>,
    is_playing: bool,
    is_preview: bool,
    user_paused: bool,
    stopping: bool,
    auto_advance: bool,
    volume: f32,
    /// Bumped by every command that changes which playlist track should
    /// be audible; an in-flight transition owns exactly one epoch.
    epoch: u64,
    preview_epoch: u64,
}

impl PlaybackState {
    fn new(volume: f32) -> Self {
        Self {
            playlist: Vec::new(),
            index: 0,
            arena: HandleArena::default(),
            preview: None,
            current_track: None,
            is_playing: false,
            is_preview: false,
            user_paused: false,
            stopping: false,
            auto_advance: false,
            volume,
            epoch: 0,
            preview_epoch: 0,
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.stopping && self.epoch == epoch
    }

    fn owns(&self, handle: HandleId) -> bool {
        !self.stopping && self.arena.primary() == Some(handle)
    }

    /// Point the playlist at `index` and claim a new epoch. The audible
    /// handle loses its completion subscription here, in the same critical
    /// section, so its end can no longer move the index a second time.
    fn begin_transition(&mut self, index: usize) -> u64 {
        if let Some(handle) = self.arena.detach_primary() {
            debug!(%handle, "primary detached for transition");
        }
        self.is_playing = false;
        self.index = index;
        self.epoch += 1;
        self.epoch
    }

    /// A transition could not make its track audible: back to idle, so a
    /// preview or a fresh start is not refused by a playlist with nothing
    /// playing.
    fn abandon_playlist(&mut self) {
        self.playlist.clear();
        self.index = 0;
        self.current_track = None;
        self.is_playing = false;
    }

    /// Leave preview mode, returning the preview handle to release.
    fn take_preview(&mut self) -> Option<HandleId> {
        self.preview_epoch += 1;
        if self.is_preview {
            self.is_preview = false;
            self.current_track = None;
            self.is_playing = false;
        }
        self.preview.take()
    }
}

struct Inner<B> {
    backend: B,
    catalog: Arc<dyn TrackCatalog>,
    settings: PlaybackSettings,
    state: Mutex<PlaybackState>,
    transition: tokio::sync::Mutex<()>,
}

/// Playlist and preview player. Cheap to clone; clones share state.
pub struct PlaybackEngine<B: AudioBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: AudioBackend> Clone for PlaybackEngine<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: AudioBackend> PlaybackEngine<B> {
    pub fn new(backend: B, catalog: Arc<dyn TrackCatalog>, settings: PlaybackSettings) -> Self {
        Self::with_volume(backend, catalog, settings, 0.7)
    }

    pub fn with_volume(
        backend: B,
        catalog: Arc<dyn TrackCatalog>,
        settings: PlaybackSettings,
        volume: f32,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                catalog,
                settings,
                state: Mutex::new(PlaybackState::new(volume.clamp(0.0, 1.0))),
                transition: tokio::sync::Mutex::new(()),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn settings(&self) -> PlaybackSettings {
        self.inner.settings
    }

    fn state(&self) -> MutexGuard<'_, PlaybackState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.state().is_current(epoch)
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let st = self.state();
        PlaybackSnapshot {
            current_track: st.current_track.clone(),
            playlist_len: st.playlist.len(),
            index: st.index,
            is_playing: st.is_playing,
            is_preview_mode: st.is_preview,
            user_paused: st.user_paused,
            auto_advance: st.auto_advance,
            volume: st.volume,
        }
    }

    /// The playlist handle currently owning the audible slot.
    pub fn primary_handle(&self) -> Option<HandleId> {
        self.state().arena.primary()
    }

    pub fn preview_handle(&self) -> Option<HandleId> {
        self.state().preview
    }

    // ── Playlist ─────────────────────────────────────────────────────

    /// Resolve `category` and start playing its first track.
    pub async fn start_playlist(&self, category: SoundCategory) -> PlaylistStart {
        let Some((epoch, tracks, preview)) = self.begin_playlist(category) else {
            return PlaylistStart::NoTracks;
        };
        if let Some(handle) = preview {
            self.release(handle).await;
        }
        match self.continue_playlist(epoch).await {
            Transition::Playing | Transition::Held => PlaylistStart::Started { tracks },
            Transition::Failed => PlaylistStart::Unavailable,
            Transition::Superseded => PlaylistStart::Interrupted,
        }
    }

    /// Asynchronous half of a playlist start claimed by `begin_playlist`.
    pub(crate) async fn continue_playlist(&self, epoch: u64) -> Transition {
        self.load_and_play(epoch).await
    }

    /// Synchronous half of [`start_playlist`](Self::start_playlist): swaps
    /// in the new playlist and claims a transition epoch. Returns `None`
    /// (touching nothing) when the category has no tracks.
    pub(crate) fn begin_playlist(
        &self,
        category: SoundCategory,
    ) -> Option<(u64, usize, Option<HandleId>)> {
        let tracks = self.inner.catalog.resolve_tracks(category);
        if tracks.is_empty() {
            info!(%category, "no tracks for category");
            return None;
        }
        let count = tracks.len();
        let mut st = self.state();
        st.stopping = false;
        st.user_paused = false;
        let preview = st.take_preview();
        st.playlist = tracks;
        let epoch = st.begin_transition(0);
        info!(%category, tracks = count, "playlist started");
        Some((epoch, count, preview))
    }

    /// Skip forward. No-op while the user has playback paused.
    pub async fn next_track(&self) -> bool {
        let epoch = {
            let mut st = self.state();
            if !self.can_skip(&st) {
                return false;
            }
            let next = (st.index + 1) % st.playlist.len();
            st.begin_transition(next)
        };
        self.load_and_play(epoch).await;
        true
    }

    /// Skip backward, wrapping to the last track. No-op while paused.
    pub async fn previous_track(&self) -> bool {
        let epoch = {
            let mut st = self.state();
            if !self.can_skip(&st) {
                return false;
            }
            let len = st.playlist.len();
            let prev = (st.index + len - 1) % len;
            st.begin_transition(prev)
        };
        self.load_and_play(epoch).await;
        true
    }

    fn can_skip(&self, st: &PlaybackState) -> bool {
        if st.user_paused {
            debug!("skip ignored while paused");
            return false;
        }
        !st.stopping && !st.playlist.is_empty()
    }

    /// Detach, fade out, release, load, subscribe, fade in.
    async fn load_and_play(&self, epoch: u64) -> Transition {
        let _turn = self.inner.transition.lock().await;
        let backend = &self.inner.backend;
        let settings = self.inner.settings;

        let (track, outgoing) = {
            let st = self.state();
            if !st.is_current(epoch) {
                return Transition::Superseded;
            }
            let Some(track) = st.playlist.get(st.index).cloned() else {
                return Transition::Superseded;
            };
            (track, st.arena.outgoing())
        };

        // Everything detached by this and any superseded transition.
        for old in outgoing {
            let from = backend.status(old).await.map(|s| s.volume).unwrap_or(0.0);
            fade(backend, old, from, 0.0, settings, || self.is_current(epoch)).await;
            let claimed = self.state().arena.claim_outgoing(old);
            if claimed {
                self.release(old).await;
            }
        }

        if !self.is_current(epoch) {
            return Transition::Superseded;
        }

        let handle = match backend.load(&track, 0.0).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(track = %track.display_name, error = %e, "track failed to load");
                let mut st = self.state();
                if st.is_current(epoch) {
                    st.abandon_playlist();
                }
                return Transition::Failed;
            }
        };

        let installed = {
            let mut st = self.state();
            if !st.is_current(epoch) {
                None
            } else if st.arena.install(handle).is_err() {
                warn!(%handle, "audible slot still occupied; dropping new handle");
                None
            } else {
                st.current_track = Some(track.clone());
                Some((st.user_paused, st.volume))
            }
        };
        let Some((paused, volume)) = installed else {
            self.release(handle).await;
            return Transition::Superseded;
        };

        if paused {
            debug!(track = %track.display_name, "loaded while paused; holding");
            return Transition::Held;
        }

        if let Err(e) = backend.play(handle).await {
            warn!(track = %track.display_name, error = %e, "track failed to start");
            let evicted = {
                let mut st = self.state();
                if st.owns(handle) {
                    st.arena.detach_primary();
                    st.abandon_playlist();
                }
                // A stop may already have drained it.
                st.arena.claim_outgoing(handle)
            };
            if evicted {
                self.release(handle).await;
            }
            return Transition::Failed;
        }
        {
            let mut st = self.state();
            if st.owns(handle) && !st.user_paused {
                st.is_playing = true;
            }
        }
        info!(track = %track.display_name, %handle, "now playing");

        fade(backend, handle, 0.0, volume, settings, || {
            let st = self.state();
            st.is_current(epoch) && !st.user_paused
        })
        .await;
        Transition::Playing
    }

    // ── Pause / resume ───────────────────────────────────────────────

    pub async fn pause(&self) {
        self.request_pause();
        self.apply_pause().await;
    }

    pub(crate) fn request_pause(&self) {
        self.state().user_paused = true;
    }

    /// Fade out and pause the primary, keeping it loaded.
    pub(crate) async fn apply_pause(&self) {
        let _turn = self.inner.transition.lock().await;
        let backend = &self.inner.backend;

        let handle = {
            let st = self.state();
            if !st.user_paused || st.stopping {
                return;
            }
            st.arena.primary()
        };
        let Some(handle) = handle else {
            return;
        };

        let still_paused = || {
            let st = self.state();
            st.user_paused && st.owns(handle)
        };

        let from = backend.status(handle).await.map(|s| s.volume).unwrap_or(0.0);
        fade(backend, handle, from, 0.0, self.inner.settings, still_paused).await;
        if !still_paused() {
            return;
        }
        if let Err(e) = backend.pause(handle).await {
            debug!(%handle, error = %e, "pause on released handle");
        }
        let mut st = self.state();
        if st.user_paused && st.arena.primary() == Some(handle) {
            st.is_playing = false;
        }
        debug!(%handle, "playback paused");
    }

    pub async fn resume(&self) {
        self.request_resume();
        self.apply_resume().await;
    }

    pub(crate) fn request_resume(&self) {
        self.state().user_paused = false;
    }

    /// Continue the retained primary, rewinding it first if it reached its
    /// end while paused.
    pub(crate) async fn apply_resume(&self) {
        let _turn = self.inner.transition.lock().await;
        let backend = &self.inner.backend;

        let target = {
            let st = self.state();
            if st.user_paused || st.stopping {
                return;
            }
            st.arena.primary().map(|h| (h, st.volume))
        };
        let Some((handle, volume)) = target else {
            return;
        };

        let status = match backend.status(handle).await {
            Ok(status) => status,
            Err(e) => {
                warn!(%handle, error = %e, "cannot resume released handle");
                let mut st = self.state();
                if st.arena.primary() == Some(handle) {
                    st.is_playing = false;
                    st.current_track = None;
                }
                return;
            }
        };
        if status.at_end() {
            debug!(%handle, "track ended while paused; rewinding");
            if let Err(e) = backend.seek(handle, 0).await {
                debug!(%handle, error = %e, "rewind failed");
            }
        }

        let still_resumed = || {
            let st = self.state();
            !st.user_paused && st.owns(handle)
        };
        if !still_resumed() {
            return;
        }
        if let Err(e) = backend.play(handle).await {
            warn!(%handle, error = %e, "resume failed");
            return;
        }
        {
            let mut st = self.state();
            if !st.user_paused && st.owns(handle) {
                st.is_playing = true;
            }
        }
        debug!(%handle, "playback resumed");
        fade(backend, handle, status.volume, volume, self.inner.settings, still_resumed).await;
    }

    // ── Stop ─────────────────────────────────────────────────────────

    /// Tear everything down. Safe to call repeatedly and from any state.
    pub async fn stop(&self) {
        let handles = self.halt();
        self.release_all(handles).await;
    }

    /// Synchronous half of [`stop`](Self::stop). After it returns no
    /// in-flight transition or completion notice can make anything audible
    /// again; the returned handles still need releasing.
    pub(crate) fn halt(&self) -> Vec<HandleId> {
        let mut st = self.state();
        st.stopping = true;
        st.epoch += 1;
        let mut handles = st.arena.drain();
        if let Some(preview) = st.take_preview() {
            handles.push(preview);
        }
        st.playlist.clear();
        st.index = 0;
        st.current_track = None;
        st.is_playing = false;
        st.user_paused = false;
        if !handles.is_empty() {
            info!(handles = handles.len(), "playback stopped");
        }
        handles
    }

    pub(crate) async fn release_all(&self, handles: Vec<HandleId>) {
        for handle in handles {
            self.release(handle).await;
        }
    }

    async fn release(&self, handle: HandleId) {
        let backend = &self.inner.backend;
        if let Err(e) = backend.stop(handle).await {
            debug!(%handle, error = %e, "stop on released handle");
        }
        if let Err(e) = backend.unload(handle).await {
            debug!(%handle, error = %e, "unload on released handle");
        }
    }

    // ── Volume / auto-advance ────────────────────────────────────────

    /// Set the target volume, applied immediately to whatever is audible.
    pub async fn set_volume(&self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        let volume = volume.clamp(0.0, 1.0);
        let targets: Vec<HandleId> = {
            let mut st = self.state();
            st.volume = volume;
            let mut targets = Vec::new();
            if st.is_playing && !st.is_preview {
                targets.extend(st.arena.primary());
            }
            targets.extend(st.preview);
            targets
        };
        for handle in targets {
            if let Err(e) = self.inner.backend.set_volume(handle, volume).await {
                debug!(%handle, error = %e, "volume change on released handle");
            }
        }
    }

    pub fn enable_auto_advance(&self) {
        self.state().auto_advance = true;
    }

    pub fn disable_auto_advance(&self) {
        self.state().auto_advance = false;
    }

    // ── Completion notices ───────────────────────────────────────────

    /// A handle played to its end. Advances to the next track, wrapping,
    /// only if the handle is still the subscribed primary and nothing has
    /// asked playback to stop, stay put or stay paused.
    pub async fn on_track_finished(&self, handle: HandleId) -> bool {
        let epoch = {
            let mut st = self.state();
            if !st.arena.accepts_completion(handle) {
                debug!(%handle, "completion from a superseded handle discarded");
                return false;
            }
            st.is_playing = false;
            if st.stopping || !st.auto_advance || st.user_paused {
                debug!(
                    %handle,
                    stopping = st.stopping,
                    auto_advance = st.auto_advance,
                    user_paused = st.user_paused,
                    "completion ignored"
                );
                return false;
            }
            if st.playlist.is_empty() {
                return false;
            }
            let next = (st.index + 1) % st.playlist.len();
            st.begin_transition(next)
        };
        self.load_and_play(epoch).await;
        true
    }

    pub async fn handle_event(&self, event: AudioEvent) -> bool {
        match event {
            AudioEvent::Finished(handle) => self.on_track_finished(handle).await,
        }
    }

    /// Drain backend notifications until the sender side closes.
    pub async fn run_events(&self, mut events: mpsc::UnboundedReceiver<AudioEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
    }

    // ── Preview ──────────────────────────────────────────────────────

    /// Play the first track of `category` for the preview window, then
    /// return to idle. Independent of the playlist path.
    pub async fn preview_track(&self, category: SoundCategory) -> PreviewStart {
        self.stop_preview().await;

        if !self.state().playlist.is_empty() {
            warn!(%category, "preview requested while a playlist is active");
            return PreviewStart::Busy;
        }
        let Some(track) = self.inner.catalog.resolve_tracks(category).into_iter().next() else {
            info!(%category, "no tracks to preview");
            return PreviewStart::NoTracks;
        };

        let (epoch, volume) = {
            let mut st = self.state();
            st.preview_epoch += 1;
            st.is_preview = true;
            (st.preview_epoch, st.volume)
        };

        let backend = &self.inner.backend;
        let handle = match backend.load(&track, volume).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(track = %track.display_name, error = %e, "preview failed to load");
                let mut st = self.state();
                if st.preview_epoch == epoch {
                    st.is_preview = false;
                }
                return PreviewStart::Unavailable;
            }
        };

        let installed = {
            let mut st = self.state();
            if st.preview_epoch == epoch && st.is_preview {
                st.preview = Some(handle);
                st.current_track = Some(track.clone());
                true
            } else {
                false
            }
        };
        if !installed {
            self.release(handle).await;
            return PreviewStart::Interrupted;
        }

        if let Err(e) = backend.play(handle).await {
            warn!(track = %track.display_name, error = %e, "preview failed to start");
            self.end_preview(epoch).await;
            return PreviewStart::Unavailable;
        }
        {
            let mut st = self.state();
            if st.preview_epoch == epoch {
                st.is_playing = true;
            }
        }
        info!(track = %track.display_name, "preview started");

        let engine = self.clone();
        let window = self.inner.settings.preview_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            engine.end_preview(epoch).await;
        });
        PreviewStart::Playing(track)
    }

    pub async fn stop_preview(&self) {
        if let Some(handle) = self.detach_preview() {
            self.release(handle).await;
            info!("preview stopped");
        }
    }

    /// Leave preview mode now; the returned handle still needs releasing.
    pub(crate) fn detach_preview(&self) -> Option<HandleId> {
        self.state().take_preview()
    }

    async fn end_preview(&self, epoch: u64) {
        let handle = {
            let mut st = self.state();
            if st.preview_epoch != epoch {
                return;
            }
            st.take_preview()
        };
        if let Some(handle) = handle {
            self.release(handle).await;
            info!("preview window elapsed");
        }
    }
}
