use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Background sound category a playlist is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundCategory {
    Ambient,
    Nature,
    Classical,
    #[serde(rename = "Lo-Fi")]
    LoFi,
    #[serde(rename = "Jazz Ambient")]
    JazzAmbient,
    /// No background sound.
    Silence,
}

impl SoundCategory {
    pub const ALL: [SoundCategory; 6] = [
        SoundCategory::Ambient,
        SoundCategory::Nature,
        SoundCategory::Classical,
        SoundCategory::LoFi,
        SoundCategory::JazzAmbient,
        SoundCategory::Silence,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            SoundCategory::Ambient => "Ambient",
            SoundCategory::Nature => "Nature",
            SoundCategory::Classical => "Classical",
            SoundCategory::LoFi => "Lo-Fi",
            SoundCategory::JazzAmbient => "Jazz Ambient",
            SoundCategory::Silence => "Silence",
        }
    }

    /// Directory name used by on-disk catalogs.
    pub fn dir_name(self) -> &'static str {
        match self {
            SoundCategory::Ambient => "Ambient",
            SoundCategory::Nature => "Nature",
            SoundCategory::Classical => "Classical",
            SoundCategory::LoFi => "lo-fi",
            SoundCategory::JazzAmbient => "jazz-ambient",
            SoundCategory::Silence => "silence",
        }
    }

    pub fn is_audible(self) -> bool {
        self != SoundCategory::Silence
    }
}

impl fmt::Display for SoundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SoundCategory {
    type Err = ValidationError;

    /// Case-insensitive; accepts display names and directory names
    /// ("Lo-Fi", "lofi", "jazz-ambient", ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "ambient" => Ok(SoundCategory::Ambient),
            "nature" => Ok(SoundCategory::Nature),
            "classical" => Ok(SoundCategory::Classical),
            "lofi" => Ok(SoundCategory::LoFi),
            "jazzambient" | "jazz" => Ok(SoundCategory::JazzAmbient),
            "silence" | "none" | "off" => Ok(SoundCategory::Silence),
            _ => Err(ValidationError::UnknownCategory(s.to_string())),
        }
    }
}

/// One playable track, as resolved by a catalog. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub display_name: String,
    pub category: SoundCategory,
    /// Opaque location understood by the audio backend (path or URI).
    pub source_locator: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_display_and_dir_names() {
        assert_eq!("Lo-Fi".parse::<SoundCategory>().unwrap(), SoundCategory::LoFi);
        assert_eq!("lofi".parse::<SoundCategory>().unwrap(), SoundCategory::LoFi);
        assert_eq!(
            "jazz-ambient".parse::<SoundCategory>().unwrap(),
            SoundCategory::JazzAmbient
        );
        assert_eq!("NATURE".parse::<SoundCategory>().unwrap(), SoundCategory::Nature);
    }

    #[test]
    fn parse_rejects_unknown() {
        let err = "Polka".parse::<SoundCategory>().unwrap_err();
        assert_eq!(err, ValidationError::UnknownCategory("Polka".into()));
    }

    #[test]
    fn serde_uses_display_names() {
        let json = serde_json::to_string(&SoundCategory::JazzAmbient).unwrap();
        assert_eq!(json, "\"Jazz Ambient\"");
        let back: SoundCategory = serde_json::from_str("\"Lo-Fi\"").unwrap();
        assert_eq!(back, SoundCategory::LoFi);
    }
}
