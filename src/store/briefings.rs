use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::JsonFile;
use crate::news::Briefing;

pub const MAX_BRIEFINGS: usize = 30;
pub const BRIEFINGS_FILE: &str = "briefings.json";

/// Briefings keyed by calendar date, newest first, at most 30 kept.
pub struct BriefingCache {
    file: Mutex<JsonFile>,
}

impl BriefingCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Mutex::new(JsonFile::new(path)),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(BRIEFINGS_FILE))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, JsonFile>> {
        self.file
            .lock()
            .map_err(|_| anyhow!("briefing cache lock poisoned"))
    }

    pub fn get(&self, date: NaiveDate) -> Result<Option<Briefing>> {
        let all: Vec<Briefing> = self.lock()?.read()?;
        Ok(all.into_iter().find(|b| b.date == date))
    }

    pub fn latest(&self) -> Result<Option<Briefing>> {
        let all: Vec<Briefing> = self.lock()?.read()?;
        Ok(all.into_iter().max_by_key(|b| b.date))
    }

    /// Replace any briefing with the same date, then prune to the newest 30.
    pub fn upsert(&self, briefing: Briefing) -> Result<()> {
        let file = self.lock()?;
        let mut all: Vec<Briefing> = file.read()?;
        all.retain(|b| b.date != briefing.date);
        all.push(briefing);
        all.sort_by(|a, b| b.date.cmp(&a.date));
        all.truncate(MAX_BRIEFINGS);
        file.write(&all)
    }

    pub fn count(&self) -> Result<usize> {
        let all: Vec<Briefing> = self.lock()?.read()?;
        Ok(all.len())
    }
}
