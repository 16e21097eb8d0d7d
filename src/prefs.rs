use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::{Context, Result};
use tracing::warn;

/// Persisted settings key for the speech rate multiplier.
pub const KEY_VOICE_SPEED: &str = "voiceSpeed";
/// Persisted settings key for the speech pitch.
pub const KEY_VOICE_PITCH: &str = "voicePitch";
/// Persisted settings key for the selected voice name, or "auto".
pub const KEY_SELECTED_VOICE: &str = "selectedVoice";
/// Persisted settings key for the UI theme.
pub const KEY_THEME: &str = "theme";

/// Key-value store abstraction over persisted user settings. The UI layer
/// owns the store; the core only reads and writes string values.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// JSON-file-backed store. Values are written through on every set.
pub struct FileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let values = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse settings file {}", path.display()))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    fn persist(&self, values: &HashMap<String, String>) {
        let json = match serde_json::to_string_pretty(values) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize settings: {}", e);
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!("Failed to write settings to {}: {}", self.path.display(), e);
        }
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value.to_string());
            self.persist(&values);
        }
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value.to_string());
        }
    }
}

/// Voice parameters read by the playback controller. A stored voice of
/// "auto" means no explicit selection.
#[derive(Debug, Clone, PartialEq)]
pub struct VoicePreferences {
    pub speed: f32,
    pub pitch: f32,
    pub voice: Option<String>,
}

impl Default for VoicePreferences {
    fn default() -> Self {
        Self {
            speed: 1.1,
            pitch: 1.05,
            voice: None,
        }
    }
}

impl VoicePreferences {
    pub fn load(store: &dyn KvStore) -> Self {
        let defaults = Self::default();

        let speed = store
            .get(KEY_VOICE_SPEED)
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.speed);
        let pitch = store
            .get(KEY_VOICE_PITCH)
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.pitch);
        let voice = store.get(KEY_SELECTED_VOICE).filter(|v| v != "auto");

        Self {
            speed,
            pitch,
            voice,
        }
    }

    pub fn save(&self, store: &dyn KvStore) {
        store.set(KEY_VOICE_SPEED, &self.speed.to_string());
        store.set(KEY_VOICE_PITCH, &self.pitch.to_string());
        store.set(
            KEY_SELECTED_VOICE,
            self.voice.as_deref().unwrap_or("auto"),
        );
    }
}

/// UI theme. Stored alongside the voice settings, read only by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn load(store: &dyn KvStore) -> Self {
        match store.get(KEY_THEME).as_deref() {
            Some("dark") => Self::Dark,
            _ => Self::Light,
        }
    }

    pub fn save(self, store: &dyn KvStore) {
        store.set(KEY_THEME, self.as_str());
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_default_when_store_empty() {
        let store = MemoryStore::new();
        let prefs = VoicePreferences::load(&store);
        assert_eq!(prefs, VoicePreferences::default());
        assert_eq!(prefs.speed, 1.1);
        assert_eq!(prefs.pitch, 1.05);
        assert!(prefs.voice.is_none());
    }

    #[test]
    fn auto_voice_means_unset() {
        let store = MemoryStore::new();
        store.set(KEY_SELECTED_VOICE, "auto");
        assert!(VoicePreferences::load(&store).voice.is_none());

        store.set(KEY_SELECTED_VOICE, "Samantha");
        assert_eq!(
            VoicePreferences::load(&store).voice.as_deref(),
            Some("Samantha")
        );
    }

    #[test]
    fn unparseable_numbers_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set(KEY_VOICE_SPEED, "fast");
        store.set(KEY_VOICE_PITCH, "0.8");

        let prefs = VoicePreferences::load(&store);
        assert_eq!(prefs.speed, 1.1);
        assert_eq!(prefs.pitch, 0.8);
    }

    #[test]
    fn preferences_round_trip() {
        let store = MemoryStore::new();
        let prefs = VoicePreferences {
            speed: 0.9,
            pitch: 1.2,
            voice: Some("Daniel".to_string()),
        };
        prefs.save(&store);
        assert_eq!(VoicePreferences::load(&store), prefs);
    }

    #[test]
    fn theme_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(Theme::load(&store), Theme::Light);
        Theme::Dark.save(&store);
        assert_eq!(Theme::load(&store), Theme::Dark);
    }

    #[test]
    fn file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        {
            let store = FileStore::open(&path).unwrap();
            store.set(KEY_VOICE_SPEED, "1.3");
            store.set(KEY_THEME, "dark");
        }

        let store = FileStore::open(&path).unwrap();
        assert_eq!(store.get(KEY_VOICE_SPEED).as_deref(), Some("1.3"));
        assert_eq!(Theme::load(&store), Theme::Dark);
    }
}
