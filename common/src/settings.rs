//! User settings: the key-value store read fresh on every summarization request.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;
use tracing::debug;

use crate::KnownModel;

/// Length level used when nothing valid is stored
pub const DEFAULT_SUMMARY_LENGTH: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SettingKey {
    ApiKey,
    SummaryLength,
    SelectedModel,
    SummaryPrompt,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::ApiKey,
        SettingKey::SummaryLength,
        SettingKey::SelectedModel,
        SettingKey::SummaryPrompt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::ApiKey => "api_key",
            SettingKey::SummaryLength => "summary_length",
            SettingKey::SelectedModel => "selected_model",
            SettingKey::SummaryPrompt => "summary_prompt",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| SettingsError::UnknownKey(s.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("unknown setting: {0}")]
    UnknownKey(String),

    #[error("summary_length must be an integer from 1 to 5, got {0:?}")]
    InvalidLength(String),

    #[error("unknown model {0:?}")]
    UnknownModel(String),
}

/// Synchronous key-value settings collaborator.
pub trait SettingsStore: Send + Sync {
    fn get(&self, key: SettingKey) -> Option<String>;

    fn set(&self, key: SettingKey, value: &str) -> Result<()>;
}

/// Reject values the settings screen would never write
pub fn validate(key: SettingKey, value: &str) -> Result<(), SettingsError> {
    match key {
        SettingKey::SummaryLength => match value.trim().parse::<u8>() {
            Ok(level) if (1..=5).contains(&level) => Ok(()),
            _ => Err(SettingsError::InvalidLength(value.to_string())),
        },
        SettingKey::SelectedModel => KnownModel::from_id(value)
            .map(|_| ())
            .ok_or_else(|| SettingsError::UnknownModel(value.to_string())),
        SettingKey::ApiKey | SettingKey::SummaryPrompt => Ok(()),
    }
}

/// In-memory store, for tests and embedding
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: SettingKey) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key.as_str()).cloned()
    }

    fn set(&self, key: SettingKey, value: &str) -> Result<()> {
        validate(key, value)?;
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(key.as_str().to_string(), value.to_string());
        Ok(())
    }
}

/// TOML-file-backed store. Every `set` writes the whole file through.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, String>>,
}

impl FileSettingsStore {
    /// Open the store at `path`; a missing file means no settings yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
            let table: BTreeMap<String, toml::Value> = toml::from_str(&data)
                .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;
            // Hand-edited files may hold bare numbers
            table
                .into_iter()
                .map(|(k, v)| match v {
                    toml::Value::String(s) => (k, s),
                    other => (k, other.to_string()),
                })
                .collect()
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), entries = values.len(), "settings loaded");

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory: {}", parent.display())
            })?;
        }
        let data = toml::to_string(values).context("Failed to serialize settings")?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write settings file: {}", self.path.display()))?;
        Ok(())
    }
}

impl SettingsStore for FileSettingsStore {
    fn get(&self, key: SettingKey) -> Option<String> {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        values.get(key.as_str()).cloned()
    }

    fn set(&self, key: SettingKey, value: &str) -> Result<()> {
        validate(key, value)?;
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        // Memory only changes once the file write succeeded
        let mut updated = values.clone();
        updated.insert(key.as_str().to_string(), value.to_string());
        self.persist(&updated)?;
        *values = updated;
        debug!(key = %key, "setting saved");
        Ok(())
    }
}

/// Typed snapshot of the settings, with defaults for anything missing or malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSettings {
    pub api_key: String,
    pub summary_length: u8,
    pub selected_model: KnownModel,
    /// Empty means "use the built-in prompt"
    pub summary_prompt: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            summary_length: DEFAULT_SUMMARY_LENGTH,
            selected_model: KnownModel::default(),
            summary_prompt: String::new(),
        }
    }
}

impl UserSettings {
    pub fn load(store: &dyn SettingsStore) -> Self {
        let summary_length = store
            .get(SettingKey::SummaryLength)
            .and_then(|v| v.trim().parse::<u8>().ok())
            .filter(|l| (1..=5).contains(l))
            .unwrap_or(DEFAULT_SUMMARY_LENGTH);
        let selected_model = store
            .get(SettingKey::SelectedModel)
            .and_then(|v| KnownModel::from_id(&v))
            .unwrap_or_default();

        Self {
            api_key: store.get(SettingKey::ApiKey).unwrap_or_default(),
            summary_length,
            selected_model,
            summary_prompt: store.get(SettingKey::SummaryPrompt).unwrap_or_default(),
        }
    }
}
