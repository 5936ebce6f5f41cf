// Read-only view of the settings store
//
// The shell owns the settings blob; the core only reads a handful of
// defaults out of it. A missing or malformed file yields the defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{AudioFormat, Container, Quality};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub download_dir: PathBuf,
    pub default_quality: Quality,
    pub default_container: Container,
    pub default_audio_format: AudioFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
            default_quality: Quality::Best,
            default_container: Container::default(),
            default_audio_format: AudioFormat::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("[Settings] malformed settings file {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let settings = Settings::load(Path::new("/nonexistent/settings.json"));
        assert_eq!(settings.default_quality, Quality::Best);
    }

    #[test]
    fn test_parse_partial_settings() {
        let json = r#"{"default_quality": "720p"}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.default_quality, Quality::Height(720));
        assert_eq!(settings.default_container, Container::Mp4);
    }

    #[test]
    fn test_roundtrip() {
        let settings = Settings {
            download_dir: PathBuf::from("/tmp/media"),
            default_quality: Quality::Height(1080),
            default_container: Container::Mkv,
            default_audio_format: AudioFormat::Opus,
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.default_quality, Quality::Height(1080));
        assert_eq!(back.default_container, Container::Mkv);
    }
}
