use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{JsonFile, Retention};

pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_NEWS_FEED_DAYS: u32 = 2;
pub const MAX_NEWS_FEED_DAYS: u32 = 30;

/// User-tunable settings persisted as `settings.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_days")]
    pub news_feed_days: u32,
}

fn default_days() -> u32 {
    DEFAULT_NEWS_FEED_DAYS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            news_feed_days: DEFAULT_NEWS_FEED_DAYS,
        }
    }
}

impl Settings {
    fn clamped(mut self) -> Self {
        self.news_feed_days = self.news_feed_days.clamp(1, MAX_NEWS_FEED_DAYS);
        self
    }
}

/// Partial update accepted by `PUT /api/settings`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub news_feed_days: Option<u32>,
}

pub struct SettingsStore {
    file: Mutex<JsonFile>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Mutex::new(JsonFile::new(path)),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(SETTINGS_FILE))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, JsonFile>> {
        self.file
            .lock()
            .map_err(|_| anyhow!("settings lock poisoned"))
    }

    pub fn get(&self) -> Result<Settings> {
        let s: Settings = self.lock()?.read()?;
        Ok(s.clamped())
    }

    pub fn save_patch(&self, patch: SettingsPatch) -> Result<Settings> {
        let file = self.lock()?;
        let mut s: Settings = file.read()?;
        if let Some(days) = patch.news_feed_days {
            s.news_feed_days = days;
        }
        let s = s.clamped();
        file.write(&s)?;
        Ok(s)
    }
}

impl Retention for SettingsStore {
    /// Unreadable settings fall back to the default window.
    fn retention_days(&self) -> u32 {
        match self.get() {
            Ok(s) => s.news_feed_days,
            Err(e) => {
                tracing::warn!(error = ?e, "settings unreadable; using default window");
                DEFAULT_NEWS_FEED_DAYS
            }
        }
    }
}
