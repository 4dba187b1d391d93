//! Synchronous command seam between the session controller and playback.
//!
//! The controller never awaits audio work. Each command either finishes
//! synchronously or hands its asynchronous tail to the Tokio runtime, so a
//! slow or failing backend cannot hold up a tick or a completion.

use tokio::runtime::Handle;
use tracing::warn;

use super::backend::AudioBackend;
use super::engine::PlaybackEngine;
use super::{SoundCategory, Track};

/// Fire-and-forget playback commands.
pub trait SoundControl: Send + Sync {
    fn start_playlist(&self, category: SoundCategory);
    fn pause(&self);
    fn resume(&self);
    /// Must be silent by the time it returns, as far as new playback goes.
    fn stop(&self);
    fn stop_preview(&self);
    fn set_auto_advance(&self, enabled: bool);
    fn now_playing(&self) -> (Option<Track>, bool, bool);
}

/// Sound disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSound;

impl SoundControl for NoSound {
    fn start_playlist(&self, _category: SoundCategory) {}
    fn pause(&self) {}
    fn resume(&self) {}
    fn stop(&self) {}
    fn stop_preview(&self) {}
    fn set_auto_advance(&self, _enabled: bool) {}
    fn now_playing(&self) -> (Option<Track>, bool, bool) {
        (None, false, false)
    }
}

fn spawn<F>(what: &'static str, task: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(rt) => {
            rt.spawn(task);
        }
        Err(_) => warn!(command = what, "no async runtime; playback command dropped"),
    }
}

impl<B: AudioBackend> SoundControl for PlaybackEngine<B> {
    fn start_playlist(&self, category: SoundCategory) {
        let Some((epoch, _, preview)) = self.begin_playlist(category) else {
            return;
        };
        let engine = self.clone();
        spawn("start_playlist", async move {
            engine.release_all(preview.into_iter().collect()).await;
            engine.continue_playlist(epoch).await;
        });
    }

    fn pause(&self) {
        self.request_pause();
        let engine = self.clone();
        spawn("pause", async move { engine.apply_pause().await });
    }

    fn resume(&self) {
        self.request_resume();
        let engine = self.clone();
        spawn("resume", async move { engine.apply_resume().await });
    }

    fn stop(&self) {
        let handles = self.halt();
        if handles.is_empty() {
            return;
        }
        let engine = self.clone();
        spawn("stop", async move { engine.release_all(handles).await });
    }

    fn stop_preview(&self) {
        let Some(handle) = self.detach_preview() else {
            return;
        };
        let engine = self.clone();
        spawn("stop_preview", async move { engine.release_all(vec![handle]).await });
    }

    fn set_auto_advance(&self, enabled: bool) {
        if enabled {
            self.enable_auto_advance();
        } else {
            self.disable_auto_advance();
        }
    }

    fn now_playing(&self) -> (Option<Track>, bool, bool) {
        let snap = self.snapshot();
        (snap.current_track, snap.is_playing, snap.is_preview_mode)
    }
}
