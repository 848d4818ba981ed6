//! # Persistent stores
//! File-backed JSON collections (`news.json`, `briefings.json`,
//! `settings.json`) under one data directory.
//!
//! Every mutation is a read-modify-write of the whole file. Each store owns a
//! mutex that is held across the full cycle, so concurrent callers queue
//! instead of overwriting each other. Single process only.

pub mod briefings;
pub mod news;
pub mod settings;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use briefings::BriefingCache;
pub use news::{NewsCache, NewsQuery, UpsertOutcome};
pub use settings::{Settings, SettingsPatch, SettingsStore};

/// Source of the "days to retain" setting; read on every cache operation.
pub trait Retention: Send + Sync {
    fn retention_days(&self) -> u32;
}

/// Constant window, for tests and one-off tools.
#[derive(Debug, Clone, Copy)]
pub struct FixedRetention(pub u32);

impl Retention for FixedRetention {
    fn retention_days(&self) -> u32 {
        self.0
    }
}

/// The three stores over one data directory, with the news cache reading its
/// retention window from the settings store.
#[derive(Clone)]
pub struct Stores {
    pub settings: Arc<SettingsStore>,
    pub news: Arc<NewsCache>,
    pub briefings: Arc<BriefingCache>,
}

impl Stores {
    pub fn open(data_dir: &Path) -> Self {
        let settings = Arc::new(SettingsStore::in_dir(data_dir));
        let retention: Arc<dyn Retention> = settings.clone();
        Self {
            news: Arc::new(NewsCache::in_dir(data_dir, retention)),
            briefings: Arc::new(BriefingCache::in_dir(data_dir)),
            settings,
        }
    }
}

/// One JSON document on disk.
#[derive(Debug, Clone)]
pub(crate) struct JsonFile {
    path: PathBuf,
}

impl JsonFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as `T::default()`; a corrupt one is an error.
    pub(crate) fn read<T: DeserializeOwned + Default>(&self) -> Result<T> {
        match fs::read_to_string(&self.path) {
            Ok(s) if s.trim().is_empty() => Ok(T::default()),
            Ok(s) => serde_json::from_str(&s)
                .with_context(|| format!("parsing {}", self.path.display())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    pub(crate) fn write<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        let json = serde_json::to_vec_pretty(value).context("serializing store")?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(&json)?;
        f.sync_all()?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}
