//! Engine configuration loaded from TOML

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowSettings {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub vsync: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            title: "Lumen".to_string(),
            vsync: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backend name, matched case-insensitively ("vulkan", "noapi", ...).
    pub api: String,
    pub window: WindowSettings,
    pub max_frames_in_flight: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: "vulkan".to_string(),
            window: WindowSettings::default(),
            max_frames_in_flight: 2,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config.api, "vulkan");
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert!(config.window.vsync);
        assert_eq!(config.max_frames_in_flight, 2);
    }

    #[test]
    fn partial_window_table_keeps_remaining_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            api = "noapi"

            [window]
            width = 640
            title = "smoke test"
            "#,
        )
        .unwrap();
        assert_eq!(config.api, "noapi");
        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.window.title, "smoke test");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = EngineConfig::from_toml_str("api = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
