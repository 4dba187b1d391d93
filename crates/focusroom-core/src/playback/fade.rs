//! Stepped linear volume fades.

use std::time::Duration;

use tracing::trace;

use super::backend::{AudioBackend, HandleId};

/// Timing of fades and the preview window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    /// Whole duration of one fade.
    pub fade_duration: Duration,
    /// Number of discrete volume changes per fade.
    pub fade_steps: u32,
    /// How long a preview plays before stopping itself.
    pub preview_window: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            fade_duration: Duration::from_millis(500),
            fade_steps: 10,
            preview_window: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FadeOutcome {
    Completed,
    /// `keep_going` turned false; the volume stays where it was.
    Interrupted,
    /// The resource went away mid-fade.
    HandleLost,
}

/// Move `handle` from `from` to `to` over `settings.fade_duration`.
///
/// `keep_going` is consulted before every step. Backend errors end the fade
/// silently with [`FadeOutcome::HandleLost`].
pub(crate) async fn fade<B: AudioBackend>(
    backend: &B,
    handle: HandleId,
    from: f32,
    to: f32,
    settings: PlaybackSettings,
    mut keep_going: impl FnMut() -> bool,
) -> FadeOutcome {
    let steps = settings.fade_steps.max(1);
    let pause = settings.fade_duration / steps;

    for step in 1..=steps {
        if !keep_going() {
            trace!(%handle, step, "fade interrupted");
            return FadeOutcome::Interrupted;
        }
        let t = step as f32 / steps as f32;
        let volume = (from + (to - from) * t).clamp(0.0, 1.0);
        if backend.set_volume(handle, volume).await.is_err() {
            trace!(%handle, step, "fade target released");
            return FadeOutcome::HandleLost;
        }
        if step < steps && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
    FadeOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{MemoryBackend, SoundCategory, Track};

    fn track() -> Track {
        Track {
            id: "t".into(),
            display_name: "t".into(),
            category: SoundCategory::Nature,
            source_locator: "t.mp3".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fade_reaches_target() {
        let backend = MemoryBackend::new();
        let h = backend.load(&track(), 0.0).await.unwrap();
        let outcome = fade(&backend, h, 0.0, 0.8, PlaybackSettings::default(), || true).await;
        assert_eq!(outcome, FadeOutcome::Completed);
        assert!((backend.volume(h).unwrap() - 0.8).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn fade_stops_when_asked() {
        let backend = MemoryBackend::new();
        let h = backend.load(&track(), 1.0).await.unwrap();
        let mut budget = 3;
        let outcome = fade(&backend, h, 1.0, 0.0, PlaybackSettings::default(), || {
            budget -= 1;
            budget >= 0
        })
        .await;
        assert_eq!(outcome, FadeOutcome::Interrupted);
        let v = backend.volume(h).unwrap();
        assert!(v > 0.0 && v < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn fade_on_released_handle_ends_quietly() {
        let backend = MemoryBackend::new();
        let h = backend.load(&track(), 1.0).await.unwrap();
        backend.unload(h).await.unwrap();
        let outcome = fade(&backend, h, 1.0, 0.0, PlaybackSettings::default(), || true).await;
        assert_eq!(outcome, FadeOutcome::HandleLost);
    }
}
