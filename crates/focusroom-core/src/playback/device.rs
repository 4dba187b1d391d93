//! Audio output through the system's default device.
//!
//! Each handle is one rodio [`Sink`] with its decoded track appended. The
//! output stream itself is not `Send`, so it lives on a dedicated thread
//! for as long as the backend exists.
//!
//! Completion is polled: [`DeviceBackend::poll_finished`] reports sinks
//! that ran dry since the previous call.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::sync::mpsc as std_mpsc;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::debug;

use super::backend::{AudioBackend, AudioEvent, HandleId, HandleStatus};
use super::Track;
use crate::error::AudioError;

type TrackSource = Decoder<BufReader<File>>;

struct DeviceSound {
    sink: Sink,
    locator: String,
    /// Zero when the container does not say.
    duration_ms: u64,
    finish_reported: bool,
}

#[derive(Default)]
struct DeviceState {
    next_id: u64,
    sounds: HashMap<HandleId, DeviceSound>,
}

impl DeviceState {
    fn sound(&mut self, handle: HandleId) -> Result<&mut DeviceSound, AudioError> {
        self.sounds
            .get_mut(&handle)
            .ok_or(AudioError::InvalidHandle(handle))
    }
}

pub struct DeviceBackend {
    output: OutputStreamHandle,
    state: Mutex<DeviceState>,
    /// Dropping this ends the thread that owns the output stream.
    _stream_guard: std_mpsc::Sender<()>,
}

impl DeviceBackend {
    /// Open the default output device.
    ///
    /// # Errors
    /// Returns [`AudioError::Unsupported`] when no output device is usable.
    pub fn open() -> Result<Self, AudioError> {
        let (handle_tx, handle_rx) = std_mpsc::channel();
        let (guard_tx, guard_rx) = std_mpsc::channel::<()>();

        thread::Builder::new()
            .name("focusroom-audio".into())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = handle_tx.send(Ok(handle));
                    // Returns once the guard sender is dropped.
                    let _ = guard_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| AudioError::Unsupported(e.to_string()))?;

        let output = handle_rx
            .recv()
            .map_err(|e| AudioError::Unsupported(e.to_string()))?
            .map_err(AudioError::Unsupported)?;
        debug!("audio output opened");

        Ok(Self {
            output,
            state: Mutex::new(DeviceState::default()),
            _stream_guard: guard_tx,
        })
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Handles that played to their end since the last call.
    pub fn poll_finished(&self) -> Vec<AudioEvent> {
        let mut st = self.lock();
        let mut finished: Vec<HandleId> = st
            .sounds
            .iter_mut()
            .filter(|(_, sound)| sound.sink.empty() && !sound.finish_reported)
            .map(|(handle, sound)| {
                sound.finish_reported = true;
                *handle
            })
            .collect();
        finished.sort();
        finished.into_iter().map(AudioEvent::Finished).collect()
    }
}

/// Open and decode a track file.
fn open_source(locator: &str) -> Result<TrackSource, AudioError> {
    let load_failed = |message: String| AudioError::LoadFailed {
        locator: locator.to_string(),
        message,
    };
    let file = File::open(locator).map_err(|e| load_failed(e.to_string()))?;
    Decoder::new(BufReader::new(file)).map_err(|e| load_failed(e.to_string()))
}

impl AudioBackend for DeviceBackend {
    async fn load(&self, track: &Track, volume: f32) -> Result<HandleId, AudioError> {
        let locator = track.source_locator.clone();
        let source = tokio::task::spawn_blocking(move || open_source(&locator))
            .await
            .map_err(|e| AudioError::LoadFailed {
                locator: track.source_locator.clone(),
                message: e.to_string(),
            })??;
        let duration_ms = source
            .total_duration()
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let sink = Sink::try_new(&self.output).map_err(|e| AudioError::Unsupported(e.to_string()))?;
        sink.pause();
        sink.set_volume(volume.clamp(0.0, 1.0));
        sink.append(source);

        let mut st = self.lock();
        st.next_id += 1;
        let handle = HandleId(st.next_id);
        st.sounds.insert(
            handle,
            DeviceSound {
                sink,
                locator: track.source_locator.clone(),
                duration_ms,
                finish_reported: false,
            },
        );
        Ok(handle)
    }

    async fn play(&self, handle: HandleId) -> Result<(), AudioError> {
        self.lock().sound(handle)?.sink.play();
        Ok(())
    }

    async fn pause(&self, handle: HandleId) -> Result<(), AudioError> {
        self.lock().sound(handle)?.sink.pause();
        Ok(())
    }

    /// Seeking a sink that already ran dry decodes the file again.
    async fn seek(&self, handle: HandleId, position_ms: u64) -> Result<(), AudioError> {
        let mut st = self.lock();
        let sound = st.sound(handle)?;
        if sound.sink.empty() {
            sound.sink.append(open_source(&sound.locator)?);
            sound.finish_reported = false;
        }
        sound
            .sink
            .try_seek(Duration::from_millis(position_ms))
            .map_err(|e| AudioError::Unsupported(e.to_string()))
    }

    async fn set_volume(&self, handle: HandleId, volume: f32) -> Result<(), AudioError> {
        self.lock()
            .sound(handle)?
            .sink
            .set_volume(volume.clamp(0.0, 1.0));
        Ok(())
    }

    async fn status(&self, handle: HandleId) -> Result<HandleStatus, AudioError> {
        let mut st = self.lock();
        let sound = st.sound(handle)?;
        let ended = sound.sink.empty();
        let (position_ms, duration_ms) = if ended {
            let end = sound.duration_ms.max(1);
            (end, end)
        } else {
            (sound.sink.get_pos().as_millis() as u64, sound.duration_ms)
        };
        Ok(HandleStatus {
            position_ms,
            duration_ms,
            volume: sound.sink.volume(),
            is_playing: !ended && !sound.sink.is_paused(),
        })
    }

    async fn stop(&self, handle: HandleId) -> Result<(), AudioError> {
        let mut st = self.lock();
        let sound = st.sound(handle)?;
        sound.sink.pause();
        if let Err(e) = sound.sink.try_seek(Duration::ZERO) {
            debug!(%handle, error = %e, "rewind on stop failed");
        }
        Ok(())
    }

    async fn unload(&self, handle: HandleId) -> Result<(), AudioError> {
        let sound = self
            .lock()
            .sounds
            .remove(&handle)
            .ok_or(AudioError::InvalidHandle(handle))?;
        sound.sink.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_load_failure() {
        let err = open_source("/nonexistent/focusroom/track.mp3").unwrap_err();
        assert!(matches!(err, AudioError::LoadFailed { .. }));
    }

    #[test]
    fn undecodable_file_is_a_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.mp3");
        std::fs::write(&path, b"not audio at all").unwrap();

        let err = open_source(path.to_str().unwrap()).unwrap_err();
        match err {
            AudioError::LoadFailed { locator, .. } => assert!(locator.ends_with("notes.mp3")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
