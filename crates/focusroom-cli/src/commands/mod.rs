pub mod config;
pub mod history;
pub mod run;
pub mod session;
pub mod sound;
pub mod stats;
pub mod tasks;

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use focusroom_core::storage::{data_dir, TaskMode};
use focusroom_core::{
    AudioBackend, BundledCatalog, Config, DirectoryCatalog, PlaybackEngine, SoundCategory,
    TaskCandidate, TaskSelection, TrackCatalog,
};

/// Catalog for the configured music source.
pub fn catalog(config: &Config) -> Result<Arc<dyn TrackCatalog>, Box<dyn Error>> {
    Ok(match &config.sound.music_dir {
        Some(dir) => Arc::new(DirectoryCatalog::new(dir)),
        None => Arc::new(BundledCatalog::new(data_dir()?.join("music"))),
    })
}

/// Playback engine over `backend` with the configured catalog, fades and volume.
pub fn engine<B: AudioBackend>(backend: B, config: &Config) -> Result<PlaybackEngine<B>, Box<dyn Error>> {
    Ok(PlaybackEngine::with_volume(
        backend,
        catalog(config)?,
        config.playback_settings(),
        config.sound.volume as f32,
    ))
}

pub fn parse_category(name: &str) -> Result<SoundCategory, Box<dyn Error>> {
    Ok(name.parse::<SoundCategory>()?)
}

/// Read a JSON array of task candidates.
pub fn read_tasks(path: &Path) -> Result<Vec<TaskCandidate>, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

/// Selection for a new session from an optional task file.
pub fn task_selection(
    config: &Config,
    tasks: Option<&Path>,
    manual: bool,
) -> Result<TaskSelection, Box<dyn Error>> {
    let Some(path) = tasks else {
        return Ok(TaskSelection::None);
    };
    let candidates = read_tasks(path)?;
    if manual || config.session.task_mode == TaskMode::Manual {
        Ok(TaskSelection::Manual(candidates))
    } else {
        Ok(TaskSelection::Automatic(candidates))
    }
}

/// Sound category for a new session: an explicit `--sound` wins over the
/// configured auto-play setting.
pub fn session_sound(
    config: &Config,
    sound: Option<&str>,
) -> Result<Option<SoundCategory>, Box<dyn Error>> {
    match sound {
        Some(name) => Ok(Some(parse_category(name)?).filter(|c| c.is_audible())),
        None => Ok(config.session_sound()),
    }
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
