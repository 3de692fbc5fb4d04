use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
    time::Duration,
};
use url::Url;

use crate::history::DEFAULT_HISTORY_DAYS;

const URL_ENV: &str = "FOCUS_CONSOLE_URL";
const DEBUG_ENV: &str = "FOCUS_CONSOLE_DEBUG";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConsoleSettings {
    pub server_url: String,
    pub history_days: u32,
    pub tick_interval_ms: u64,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".into(),
            history_days: DEFAULT_HISTORY_DAYS,
            tick_interval_ms: 1000,
        }
    }
}

impl ConsoleSettings {
    pub fn server_url(&self) -> Result<Url> {
        Url::parse(&self.server_url)
            .with_context(|| format!("invalid server url '{}'", self.server_url))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(URL_ENV) {
            if !url.trim().is_empty() {
                self.server_url = url.trim().to_string();
            }
        }
        self
    }
}

/// `FOCUS_CONSOLE_DEBUG=1` (or `true`) turns on debug logging.
pub fn debug_enabled() -> bool {
    std::env::var(DEBUG_ENV)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Settings persisted as pretty JSON. A missing or unreadable file yields
/// defaults rather than an error.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ConsoleSettings>,
}

impl SettingsStore {
    /// `<config dir>/focus-console/settings.json`.
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("no config directory on this platform")?;
        Ok(base.join("focus-console").join("settings.json"))
    }

    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("ignoring corrupt settings at {}: {err}", path.display());
                ConsoleSettings::default()
            })
        } else {
            ConsoleSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored settings with environment overrides applied.
    pub fn current(&self) -> ConsoleSettings {
        self.stored().with_env_overrides()
    }

    /// Stored settings exactly as on disk.
    pub fn stored(&self) -> ConsoleSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update(&self, settings: ConsoleSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        *guard = settings;
        self.persist(&guard)
    }

    fn persist(&self, data: &ConsoleSettings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create settings directory {}", parent.display())
            })?;
        }
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
