//! Runtime configuration: blitting, palette, key and button bindings.

use crate::error::{DrapoError, Result};
use crate::event::MouseButton;
use crate::style::Palette;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Keyboard shortcuts understood by interactive objects.
///
/// Key names use the host's "modifier+key" convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Validate the current position and stop interaction.
    pub stop: String,
    /// Record the cursor position as a click.
    pub add: String,
    /// Drop the most recent click.
    pub pop: String,
    /// Show or hide the cursor lines.
    pub toggle_visibility: String,
    pub wider: String,
    pub narrower: String,
    pub next_color: String,
    pub previous_color: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            stop: "enter".to_string(),
            add: "a".to_string(),
            pop: "z".to_string(),
            toggle_visibility: " ".to_string(),
            wider: "shift+up".to_string(),
            narrower: "shift+down".to_string(),
            next_color: "shift+right".to_string(),
            previous_color: "shift+left".to_string(),
        }
    }
}

/// Mouse button roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonBindings {
    /// Cursor: record a click.
    pub add: MouseButton,
    /// Cursor: drop the most recent click.
    pub pop: MouseButton,
    /// Cursor: stop recording.
    pub stop: MouseButton,
    /// Line and rectangle: delete the picked object.
    pub remove: MouseButton,
}

impl Default for ButtonBindings {
    fn default() -> Self {
        Self {
            add: MouseButton::Left,
            pop: MouseButton::Right,
            stop: MouseButton::Middle,
            remove: MouseButton::Right,
        }
    }
}

/// Library configuration shared by every object of a [`crate::Context`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default blitting flag for new objects.
    pub blit: bool,
    pub palette: Palette,
    pub keys: KeyBindings,
    pub buttons: ButtonBindings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            blit: true,
            palette: Palette::default(),
            keys: KeyBindings::default(),
            buttons: ButtonBindings::default(),
        }
    }
}

impl Config {
    /// Parse a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DrapoError::Config(e.to_string()))
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| DrapoError::Config(e.to_string()))
    }

    /// Load a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DrapoError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&json)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Write the configuration as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .map_err(|e| DrapoError::Config(format!("{}: {}", path.display(), e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.blit);
        assert_eq!(config.keys.stop, "enter");
        assert_eq!(config.keys.toggle_visibility, " ");
        assert_eq!(config.buttons.remove, MouseButton::Right);
        assert_eq!(config.buttons.stop, MouseButton::Middle);
    }

    #[test]
    fn test_partial_json() {
        let config = Config::from_json(r#"{"blit": false, "keys": {"stop": "q"}}"#).unwrap();
        assert!(!config.blit);
        assert_eq!(config.keys.stop, "q");
        assert_eq!(config.keys.add, "a");
        assert_eq!(config.palette, Palette::default());
    }

    #[test]
    fn test_invalid_json() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, DrapoError::Config(_)));
    }

    #[test]
    fn test_load_and_save() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"buttons": {{"add": "Middle"}}}}"#).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.buttons.add, MouseButton::Middle);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drapo.json");
        config.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, DrapoError::Config(_)));
    }
}
