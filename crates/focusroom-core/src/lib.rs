//! # Focusroom Core Library
//!
//! This library provides the focus session engine behind the Focusroom
//! study timer: a countdown that stays correct across pauses and process
//! suspension, driving a background playlist whose transitions are safe
//! against every interleaving of ticks, user commands and track
//! completions.
//!
//! ## Architecture
//!
//! - **Session Controller**: A wall-clock-based state machine that requires the
//!   caller to periodically invoke `tick()` and forward suspend/resume signals
//! - **Playback Engine**: Async playlist player over an [`AudioBackend`], with
//!   an independent preview path
//! - **Task Selector**: Deterministic ranking of candidate tasks
//! - **Storage**: SQLite-based session results and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionController`]: Session state machine
//! - [`PlaybackEngine`]: Playlist and preview playback
//! - [`TrackCatalog`]: Category to track lookup
//! - [`Database`]: Session result persistence
//! - [`Config`]: Application configuration management

pub mod catalog;
pub mod clock;
pub mod error;
pub mod events;
pub mod playback;
pub mod session;
pub mod storage;
pub mod task;

pub use catalog::{BundledCatalog, DirectoryCatalog, TrackCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{AudioError, ConfigError, CoreError, DatabaseError, PersistenceError, ValidationError};
pub use events::Event;
#[cfg(feature = "device")]
pub use playback::DeviceBackend;
pub use playback::{
    AudioBackend, MemoryBackend, NoSound, PlaybackEngine, PlaybackSettings, PlaybackSnapshot,
    PlaylistStart, PreviewStart, SoundCategory, SoundControl, Track,
};
pub use session::{
    ReportSource, Session, SessionController, SessionReporter, SessionStatus, SessionSummary,
    SessionView,
};
pub use storage::{Config, Database, SessionLog};
pub use task::{TaskCandidate, TaskSelection};
