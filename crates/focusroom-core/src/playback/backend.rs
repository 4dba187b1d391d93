//! Audio device seam.
//!
//! The engine talks to audio output only through [`AudioBackend`]. Every
//! method is asynchronous and every await is a point where other events
//! (ticks, user commands, completion notices) may run.

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use super::Track;
use crate::error::AudioError;

/// Identity of one loaded sound resource. Never reused by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandleStatus {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub volume: f32,
    pub is_playing: bool,
}

impl HandleStatus {
    pub fn at_end(&self) -> bool {
        self.duration_ms > 0 && self.position_ms >= self.duration_ms
    }
}

/// Notification emitted by a backend when a handle plays to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    Finished(HandleId),
}

pub trait AudioBackend: Send + Sync + 'static {
    /// Load a track, paused, at the given volume.
    fn load(
        &self,
        track: &Track,
        volume: f32,
    ) -> impl Future<Output = Result<HandleId, AudioError>> + Send;

    fn play(&self, handle: HandleId) -> impl Future<Output = Result<(), AudioError>> + Send;

    fn pause(&self, handle: HandleId) -> impl Future<Output = Result<(), AudioError>> + Send;

    fn seek(
        &self,
        handle: HandleId,
        position_ms: u64,
    ) -> impl Future<Output = Result<(), AudioError>> + Send;

    fn set_volume(
        &self,
        handle: HandleId,
        volume: f32,
    ) -> impl Future<Output = Result<(), AudioError>> + Send;

    fn status(
        &self,
        handle: HandleId,
    ) -> impl Future<Output = Result<HandleStatus, AudioError>> + Send;

    fn stop(&self, handle: HandleId) -> impl Future<Output = Result<(), AudioError>> + Send;

    /// Free the resource. The handle is invalid afterwards.
    fn unload(&self, handle: HandleId) -> impl Future<Output = Result<(), AudioError>> + Send;
}
