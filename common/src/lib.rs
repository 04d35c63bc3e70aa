/*!
common/src/lib.rs

Shared configuration types and settings storage for sharesum.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader that merges a default config file with an optional override
- The list of selectable models
- The user settings store (see `settings`)
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod settings;

pub use settings::{
    FileSettingsStore, MemorySettingsStore, SettingKey, SettingsError, SettingsStore, UserSettings,
};

/// Default endpoint root for the generative language API
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default location of the user settings file
pub const DEFAULT_SETTINGS_PATH: &str = "data/settings.toml";

/// Models a user can select
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KnownModel {
    #[default]
    Gemini20Flash,
    Gemini20FlashLite,
    Gemini15Flash,
    Gemini15Pro,
}

impl KnownModel {
    pub const ALL: [KnownModel; 4] = [
        KnownModel::Gemini20Flash,
        KnownModel::Gemini20FlashLite,
        KnownModel::Gemini15Flash,
        KnownModel::Gemini15Pro,
    ];

    pub fn id(self) -> &'static str {
        match self {
            KnownModel::Gemini20Flash => "gemini-2.0-flash",
            KnownModel::Gemini20FlashLite => "gemini-2.0-flash-lite",
            KnownModel::Gemini15Flash => "gemini-1.5-flash",
            KnownModel::Gemini15Pro => "gemini-1.5-pro",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            KnownModel::Gemini20Flash => "Gemini 2.0 Flash",
            KnownModel::Gemini20FlashLite => "Gemini 2.0 Flash-Lite",
            KnownModel::Gemini15Flash => "Gemini 1.5 Flash",
            KnownModel::Gemini15Pro => "Gemini 1.5 Pro",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL.into_iter().find(|m| m.id() == id)
    }
}

/// Remote LLM configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Endpoint root, `models/{model}:generateContent` is appended
    pub api_base: Option<String>,
    /// Environment variable holding an API key, used when the settings store has none
    pub api_key_env: Option<String>,
    pub connect_timeout_seconds: Option<u64>,
    pub read_timeout_seconds: Option<u64>,
    pub write_timeout_seconds: Option<u64>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub max_output_tokens: Option<u32>,
}

impl LlmConfig {
    pub fn api_base(&self) -> &str {
        self.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn connect_timeout_seconds(&self) -> u64 {
        self.connect_timeout_seconds.unwrap_or(30)
    }

    pub fn read_timeout_seconds(&self) -> u64 {
        self.read_timeout_seconds.unwrap_or(60)
    }

    pub fn write_timeout_seconds(&self) -> u64 {
        self.write_timeout_seconds.unwrap_or(30)
    }

    /// Key from the configured environment variable, if any and non-blank
    pub fn api_key_from_env(&self) -> Option<String> {
        let var = self.api_key_env.as_deref()?;
        std::env::var(var).ok().filter(|k| !k.trim().is_empty())
    }
}

/// Where user settings are persisted
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsConfig {
    pub path: Option<String>,
}

impl SettingsConfig {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(DEFAULT_SETTINGS_PATH)
    }
}

/// Handling of shared payloads before they reach the summarizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Fetch and extract the article when the shared text is a bare link
    pub fetch_links: Option<bool>,
    pub fetch_timeout_seconds: Option<u64>,
    /// Cap (in characters) on the text handed to the summarizer
    pub max_chars: Option<usize>,
}

impl ShareConfig {
    pub fn fetch_links(&self) -> bool {
        self.fetch_links.unwrap_or(false)
    }

    pub fn fetch_timeout_seconds(&self) -> u64 {
        self.fetch_timeout_seconds.unwrap_or(20)
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub share: ShareConfig,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped, so with neither present the built-in defaults apply.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}
