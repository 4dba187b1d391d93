//! In-process simulated audio backend.
//!
//! Keeps playback position per handle and advances it only when told to
//! via [`MemoryBackend::advance`]. Used by the CLI's simulated playback and
//! by tests, which can also inject load latency and load failures.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::backend::{AudioBackend, AudioEvent, HandleId, HandleStatus};
use super::Track;
use crate::error::AudioError;

const DEFAULT_TRACK_MS: u64 = 3 * 60 * 1000;

#[derive(Debug, Clone)]
struct SimSound {
    locator: String,
    position_ms: u64,
    duration_ms: u64,
    volume: f32,
    playing: bool,
}

#[derive(Debug, Default)]
struct SimState {
    next_id: u64,
    sounds: HashMap<HandleId, SimSound>,
    durations: HashMap<String, u64>,
    failing: HashSet<String>,
    fail_all: bool,
    fail_play: bool,
    loads: Vec<String>,
    max_playing: usize,
}

impl SimState {
    fn sound(&mut self, handle: HandleId) -> Result<&mut SimSound, AudioError> {
        self.sounds
            .get_mut(&handle)
            .ok_or(AudioError::InvalidHandle(handle))
    }

    fn playing_count(&self) -> usize {
        self.sounds.values().filter(|s| s.playing).count()
    }
}

#[derive(Debug)]
pub struct MemoryBackend {
    state: Mutex<SimState>,
    default_duration_ms: u64,
    load_delay: Duration,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            default_duration_ms: DEFAULT_TRACK_MS,
            load_delay: Duration::ZERO,
        }
    }

    /// Length given to tracks without an explicit duration.
    pub fn with_track_length(mut self, length: Duration) -> Self {
        self.default_duration_ms = length.as_millis() as u64;
        self
    }

    /// Simulated I/O latency of every `load`.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_duration(&self, locator: &str, length: Duration) {
        self.lock()
            .durations
            .insert(locator.to_string(), length.as_millis() as u64);
    }

    /// Make every load of `locator` fail.
    pub fn fail_loads_for(&self, locator: &str) {
        self.lock().failing.insert(locator.to_string());
    }

    pub fn fail_all_loads(&self, fail: bool) {
        self.lock().fail_all = fail;
    }

    /// Make every `play` fail as if the output device went away.
    pub fn fail_plays(&self, fail: bool) {
        self.lock().fail_play = fail;
    }

    /// Move every playing sound forward; returns the handles that reached
    /// their end during this step.
    pub fn advance(&self, by: Duration) -> Vec<AudioEvent> {
        let step = by.as_millis() as u64;
        let mut st = self.lock();
        let mut finished = Vec::new();
        for (handle, sound) in st.sounds.iter_mut() {
            if !sound.playing {
                continue;
            }
            sound.position_ms = sound.position_ms.saturating_add(step).min(sound.duration_ms);
            if sound.position_ms >= sound.duration_ms {
                sound.playing = false;
                finished.push(*handle);
            }
        }
        finished.sort();
        finished.into_iter().map(AudioEvent::Finished).collect()
    }

    /// Jump a sound to its end as if it had played out.
    pub fn finish(&self, handle: HandleId) -> Option<AudioEvent> {
        let mut st = self.lock();
        let sound = st.sounds.get_mut(&handle)?;
        sound.position_ms = sound.duration_ms;
        sound.playing = false;
        Some(AudioEvent::Finished(handle))
    }

    pub fn is_loaded(&self, handle: HandleId) -> bool {
        self.lock().sounds.contains_key(&handle)
    }

    pub fn is_playing(&self, handle: HandleId) -> bool {
        self.lock()
            .sounds
            .get(&handle)
            .map(|s| s.playing)
            .unwrap_or(false)
    }

    pub fn volume(&self, handle: HandleId) -> Option<f32> {
        self.lock().sounds.get(&handle).map(|s| s.volume)
    }

    pub fn position_ms(&self, handle: HandleId) -> Option<u64> {
        self.lock().sounds.get(&handle).map(|s| s.position_ms)
    }

    pub fn locator(&self, handle: HandleId) -> Option<String> {
        self.lock().sounds.get(&handle).map(|s| s.locator.clone())
    }

    /// Handles still holding a resource.
    pub fn loaded_handles(&self) -> Vec<HandleId> {
        let mut handles: Vec<_> = self.lock().sounds.keys().copied().collect();
        handles.sort();
        handles
    }

    /// Handles currently producing sound.
    pub fn playing_handles(&self) -> Vec<HandleId> {
        let mut handles: Vec<_> = self
            .lock()
            .sounds
            .iter()
            .filter(|(_, s)| s.playing)
            .map(|(h, _)| *h)
            .collect();
        handles.sort();
        handles
    }

    /// Highest number of sounds that were playing at the same time.
    pub fn max_concurrent_playing(&self) -> usize {
        self.lock().max_playing
    }

    /// Locators in the order they were requested.
    pub fn load_history(&self) -> Vec<String> {
        self.lock().loads.clone()
    }
}

impl AudioBackend for MemoryBackend {
    async fn load(&self, track: &Track, volume: f32) -> Result<HandleId, AudioError> {
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }
        let mut st = self.lock();
        st.loads.push(track.source_locator.clone());
        if st.fail_all || st.failing.contains(&track.source_locator) {
            return Err(AudioError::LoadFailed {
                locator: track.source_locator.clone(),
                message: "asset unavailable".into(),
            });
        }
        st.next_id += 1;
        let handle = HandleId(st.next_id);
        let duration_ms = st
            .durations
            .get(&track.source_locator)
            .copied()
            .unwrap_or(self.default_duration_ms);
        st.sounds.insert(
            handle,
            SimSound {
                locator: track.source_locator.clone(),
                position_ms: 0,
                duration_ms,
                volume: volume.clamp(0.0, 1.0),
                playing: false,
            },
        );
        Ok(handle)
    }

    async fn play(&self, handle: HandleId) -> Result<(), AudioError> {
        let mut st = self.lock();
        if st.fail_play {
            return Err(AudioError::Unsupported("output device unavailable".into()));
        }
        let sound = st.sound(handle)?;
        if sound.position_ms < sound.duration_ms {
            sound.playing = true;
        }
        let playing = st.playing_count();
        st.max_playing = st.max_playing.max(playing);
        Ok(())
    }

    async fn pause(&self, handle: HandleId) -> Result<(), AudioError> {
        self.lock().sound(handle)?.playing = false;
        Ok(())
    }

    async fn seek(&self, handle: HandleId, position_ms: u64) -> Result<(), AudioError> {
        let mut st = self.lock();
        let sound = st.sound(handle)?;
        sound.position_ms = position_ms.min(sound.duration_ms);
        Ok(())
    }

    async fn set_volume(&self, handle: HandleId, volume: f32) -> Result<(), AudioError> {
        self.lock().sound(handle)?.volume = volume.clamp(0.0, 1.0);
        Ok(())
    }

    async fn status(&self, handle: HandleId) -> Result<HandleStatus, AudioError> {
        let mut st = self.lock();
        let sound = st.sound(handle)?;
        Ok(HandleStatus {
            position_ms: sound.position_ms,
            duration_ms: sound.duration_ms,
            volume: sound.volume,
            is_playing: sound.playing,
        })
    }

    async fn stop(&self, handle: HandleId) -> Result<(), AudioError> {
        let mut st = self.lock();
        let sound = st.sound(handle)?;
        sound.playing = false;
        sound.position_ms = 0;
        Ok(())
    }

    async fn unload(&self, handle: HandleId) -> Result<(), AudioError> {
        self.lock()
            .sounds
            .remove(&handle)
            .map(|_| ())
            .ok_or(AudioError::InvalidHandle(handle))
    }
}
