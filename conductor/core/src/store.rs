//! Persisted Settings
//!
//! The settings store is an external collaborator; the engine only needs
//! load/save of one document:
//!
//! ```json
//! {
//!   "tutorial": { "completedAt": null, "lastStep": 3, "wasInterrupted": true },
//!   "hotkeys":  { "toggleChat": "CommandOrControl+Shift+Space",
//!                 "togglePanel": "CommandOrControl+Shift+P" },
//!   "pet":      { "attentionSeeker": true, "position": { "x": 40, "y": 60 } }
//! }
//! ```
//!
//! Two implementations ship here: [`MemoryStore`] for embedding and tests and
//! [`JsonFileStore`] for the daemon. Missing fields fall back to defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::HotkeyAction;
use crate::geometry::Point;

/// Errors from a settings store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem failure
    #[error("Settings I/O failed at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// Document could not be (de)serialized
    #[error("Settings document is invalid: {0}")]
    Format(#[from] serde_json::Error),
}

/// `tutorial.*` keys
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TutorialRecord {
    /// When the tutorial was finished or skipped
    pub completed_at: Option<DateTime<Utc>>,
    /// Last step reached (0 = never started)
    pub last_step: u8,
    /// A run was started and never finished
    pub was_interrupted: bool,
}

/// `hotkeys.*` keys (Electron-style accelerator strings)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HotkeyBindings {
    /// Accelerator for toggling chat
    pub toggle_chat: String,
    /// Accelerator for toggling the side panel
    pub toggle_panel: String,
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            toggle_chat: "CommandOrControl+Shift+Space".to_string(),
            toggle_panel: "CommandOrControl+Shift+P".to_string(),
        }
    }
}

impl HotkeyBindings {
    /// Accelerator bound to `action`
    #[must_use]
    pub fn binding(&self, action: HotkeyAction) -> &str {
        match action {
            HotkeyAction::ToggleChat => &self.toggle_chat,
            HotkeyAction::TogglePanel => &self.toggle_panel,
        }
    }
}

/// `pet.*` keys
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PetSettings {
    /// Whether the agent may come find the cursor
    pub attention_seeker: bool,
    /// Last settled position
    pub position: Option<Point>,
}

impl Default for PetSettings {
    fn default() -> Self {
        Self {
            attention_seeker: true,
            position: None,
        }
    }
}

/// The whole persisted document
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSettings {
    /// Tutorial progress
    pub tutorial: TutorialRecord,
    /// Hotkey bindings
    pub hotkeys: HotkeyBindings,
    /// Agent preferences and position
    pub pet: PetSettings,
}

/// Load/save access to the persisted settings document
pub trait SettingsStore: Send {
    /// Read the current document
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read or parsed.
    fn load(&self) -> Result<PersistedSettings, StoreError>;

    /// Replace the document
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, settings: &PersistedSettings) -> Result<(), StoreError>;
}

/// In-memory store; clones share the same document
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<PersistedSettings>>,
}

impl MemoryStore {
    /// Create a store holding `settings`
    #[must_use]
    pub fn new(settings: PersistedSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    /// Copy of the current document
    #[must_use]
    pub fn snapshot(&self) -> PersistedSettings {
        self.inner.read().clone()
    }

    /// Edit the document in place (as an external settings UI would)
    pub fn update(&self, edit: impl FnOnce(&mut PersistedSettings)) {
        edit(&mut self.inner.write());
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self) -> Result<PersistedSettings, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, settings: &PersistedSettings) -> Result<(), StoreError> {
        *self.inner.write() = settings.clone();
        Ok(())
    }
}

/// JSON file store
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// crash mid-write never leaves a truncated document behind.
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `$XDG_CONFIG_HOME/pinchy/settings.json`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pinchy").join("settings.json"))
    }

    /// Backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self) -> Result<PersistedSettings, StoreError> {
        if !self.path.exists() {
            return Ok(PersistedSettings::default());
        }
        let content = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if content.trim().is_empty() {
            return Ok(PersistedSettings::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, settings: &PersistedSettings) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings: PersistedSettings =
            serde_json::from_str(r#"{"tutorial":{"lastStep":4,"wasInterrupted":true}}"#).unwrap();
        assert_eq!(settings.tutorial.last_step, 4);
        assert!(settings.tutorial.was_interrupted);
        assert!(settings.tutorial.completed_at.is_none());
        assert!(settings.pet.attention_seeker);
        assert_eq!(settings.hotkeys, HotkeyBindings::default());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("settings.json"));

        assert_eq!(store.load().unwrap(), PersistedSettings::default());

        let mut settings = PersistedSettings::default();
        settings.pet.position = Some(Point::new(12, 34));
        settings.tutorial.last_step = 7;
        store.save(&settings).unwrap();

        assert_eq!(store.load().unwrap(), settings);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_file_store_reports_corrupt_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[test]
    fn test_memory_store_clones_share_document() {
        let store = MemoryStore::default();
        let other = store.clone();
        other.update(|s| s.hotkeys.toggle_chat = "Alt+C".into());
        assert_eq!(store.load().unwrap().hotkeys.binding(HotkeyAction::ToggleChat), "Alt+C");
    }
}
