//! Track catalogs.
//!
//! A catalog answers one question: which tracks belong to a sound
//! category, in playlist order. It never fails; "nothing found" is an
//! empty list.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::playback::{SoundCategory, Track};

const AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "m4a"];

pub trait TrackCatalog: Send + Sync {
    fn resolve_tracks(&self, category: SoundCategory) -> Vec<Track>;
}

/// (file name, display name) pairs shipped with the app.
fn bundled_files(category: SoundCategory) -> &'static [(&'static str, &'static str)] {
    match category {
        SoundCategory::Ambient => &[
            ("Epic Spectrum - Wallflower (freetouse.com).mp3", "Wallflower - Epic Spectrum"),
            ("Pufino - Creek (freetouse.com).mp3", "Creek - Pufino"),
            ("Pufino - Flourish (freetouse.com).mp3", "Flourish - Pufino"),
        ],
        SoundCategory::Nature => &[(
            "Windy trees in mountain forest.mp3",
            "Windy Trees in Mountain Forest",
        )],
        SoundCategory::Classical => &[
            ("Aeris - Sky With Yellow Spots (freetouse.com).mp3", "Sky With Yellow Spots - Aeris"),
            ("Alegend - Wings of Freedom (freetouse.com).mp3", "Wings of Freedom - Alegend"),
            ("Epic Spectrum - Sky Clearing (freetouse.com).mp3", "Sky Clearing - Epic Spectrum"),
            ("Guillermo Guareschi - Farewell (freetouse.com).mp3", "Farewell - Guillermo Guareschi"),
            ("Walen - Dragon Kingdom (freetouse.com).mp3", "Dragon Kingdom - Walen"),
        ],
        SoundCategory::LoFi => &[
            ("Lukrembo - Biscuit (freetouse.com).mp3", "Biscuit - Lukrembo"),
            ("Lukrembo - Donut (freetouse.com).mp3", "Donut - Lukrembo"),
            ("Lukrembo - Marshmallow (freetouse.com).mp3", "Marshmallow - Lukrembo"),
            ("Lukrembo - Sunset (freetouse.com).mp3", "Sunset - Lukrembo"),
            ("massobeats - honey jam (freetouse.com).mp3", "Honey Jam - massobeats"),
        ],
        SoundCategory::JazzAmbient => &[
            ("Aylex - Italy (freetouse.com).mp3", "Italy - Aylex"),
            ("Hazelwood - At Ease (freetouse.com).mp3", "At Ease - Hazelwood"),
            ("Lukrembo - Cheese (freetouse.com).mp3", "Cheese - Lukrembo"),
            ("Lukrembo - Sunset (freetouse.com).mp3", "Sunset - Lukrembo (Jazz)"),
            ("Moavii - Downtown (freetouse.com).mp3", "Downtown - Moavii"),
            ("Pufino - Fantasy (freetouse.com).mp3", "Fantasy - Pufino"),
        ],
        SoundCategory::Silence => &[],
    }
}

/// Curated display name for a known file, or the file stem.
pub fn display_name_for(file_name: &str) -> String {
    SoundCategory::ALL
        .iter()
        .flat_map(|c| bundled_files(*c).iter())
        .find(|(file, _)| *file == file_name)
        .map(|(_, display)| (*display).to_string())
        .unwrap_or_else(|| {
            Path::new(file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| file_name.to_string())
        })
}

fn track_id(category: SoundCategory, position: usize) -> String {
    format!("{}-{}", category.display_name(), position + 1)
}

/// The built-in track table. Locators are rooted at `root` without
/// checking the disk; the audio backend reports missing files on load.
#[derive(Debug, Clone)]
pub struct BundledCatalog {
    root: PathBuf,
}

impl BundledCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl TrackCatalog for BundledCatalog {
    fn resolve_tracks(&self, category: SoundCategory) -> Vec<Track> {
        bundled_files(category)
            .iter()
            .enumerate()
            .map(|(i, (file, display))| Track {
                id: track_id(category, i),
                display_name: (*display).to_string(),
                category,
                source_locator: self
                    .root
                    .join(category.dir_name())
                    .join(file)
                    .to_string_lossy()
                    .into_owned(),
            })
            .collect()
    }
}

/// Scans `<root>/<category dir>/` for audio files, sorted by name.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn scan(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_audio = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| AUDIO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_audio {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl TrackCatalog for DirectoryCatalog {
    fn resolve_tracks(&self, category: SoundCategory) -> Vec<Track> {
        if !category.is_audible() {
            return Vec::new();
        }
        let dir = self.root.join(category.dir_name());
        let files = match self.scan(&dir) {
            Ok(files) => files,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot read music directory");
                return Vec::new();
            }
        };
        debug!(category = %category, count = files.len(), "resolved tracks from directory");

        files
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Track {
                    id: track_id(category, i),
                    display_name: display_name_for(&file_name),
                    category,
                    source_locator: path.to_string_lossy().into_owned(),
                }
            })
            .collect()
    }
}
