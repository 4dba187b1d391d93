//! Background sound playback.
//!
//! [`PlaybackEngine`] plays a category playlist through an [`AudioBackend`]
//! and runs short category previews. [`SoundControl`] is the synchronous
//! face the session controller uses.
//!
//! With the `device` feature, [`DeviceBackend`] plays through the default
//! audio output; otherwise only the in-memory simulator is available.

mod backend;
mod control;
#[cfg(feature = "device")]
mod device;
mod engine;
mod fade;
mod memory;
mod slot;
mod track;

pub use backend::{AudioBackend, AudioEvent, HandleId, HandleStatus};
pub use control::{NoSound, SoundControl};
#[cfg(feature = "device")]
pub use device::DeviceBackend;
pub use engine::{PlaybackEngine, PlaybackSnapshot, PlaylistStart, PreviewStart};
pub use fade::PlaybackSettings;
pub use memory::MemoryBackend;
pub use track::{SoundCategory, Track};
