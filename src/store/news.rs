//! News cache: URL-deduplicated, age-bounded, capped.
//!
//! The retention cutoff is applied on every read *and* every write, so
//! shrinking the window takes effect on the next call even if nothing new has
//! been ingested.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use super::{JsonFile, Retention};
use crate::news::{Category, Classification, NewsRecord};

pub const MAX_STORED_RECORDS: usize = 500;
pub const NEWS_FILE: &str = "news.json";

/// Optional filters for `NewsCache::query`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewsQuery {
    pub category: Option<Category>,
    pub search: Option<String>,
    pub limit: Option<usize>,
}

impl NewsQuery {
    pub fn limit(n: usize) -> Self {
        Self {
            limit: Some(n),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UpsertOutcome {
    pub added: usize,
    pub stored: usize,
}

pub struct NewsCache {
    file: Mutex<JsonFile>,
    retention: Arc<dyn Retention>,
    max_records: usize,
}

/// `now - days`; records published before this are out of the window.
pub fn retention_cutoff(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(days))
}

/// Merge `incoming` in front of `existing` (URLs already stored are skipped),
/// drop everything older than `cutoff`, keep the first `cap`.
/// Returns the new store and how many incoming records were added.
pub fn merge_records(
    existing: Vec<NewsRecord>,
    incoming: Vec<NewsRecord>,
    cutoff: DateTime<Utc>,
    cap: usize,
) -> (Vec<NewsRecord>, usize) {
    let mut seen: HashSet<String> = existing.iter().map(|r| r.source_url.clone()).collect();
    let fresh: Vec<NewsRecord> = incoming
        .into_iter()
        .filter(|r| !r.source_url.is_empty() && seen.insert(r.source_url.clone()))
        .filter(|r| r.published_at >= cutoff)
        .collect();
    let added = fresh.len().min(cap);

    let mut merged: Vec<NewsRecord> = fresh
        .into_iter()
        .chain(existing.into_iter().filter(|r| r.published_at >= cutoff))
        .collect();
    merged.truncate(cap);
    (merged, added)
}

/// Urgency descending, then most recent first.
pub fn rank(records: &mut [NewsRecord]) {
    records.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then_with(|| b.published_at.cmp(&a.published_at))
    });
}

impl NewsCache {
    pub fn new(path: PathBuf, retention: Arc<dyn Retention>) -> Self {
        Self {
            file: Mutex::new(JsonFile::new(path)),
            retention,
            max_records: MAX_STORED_RECORDS,
        }
    }

    pub fn in_dir(data_dir: &std::path::Path, retention: Arc<dyn Retention>) -> Self {
        Self::new(data_dir.join(NEWS_FILE), retention)
    }

    pub fn with_max_records(mut self, cap: usize) -> Self {
        self.max_records = cap;
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, JsonFile>> {
        self.file
            .lock()
            .map_err(|_| anyhow!("news cache lock poisoned"))
    }

    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        retention_cutoff(now, self.retention.retention_days())
    }

    pub fn upsert(&self, incoming: Vec<NewsRecord>) -> Result<UpsertOutcome> {
        self.upsert_at(incoming, Utc::now())
    }

    /// Merge new records into the store and rewrite it.
    pub fn upsert_at(&self, incoming: Vec<NewsRecord>, now: DateTime<Utc>) -> Result<UpsertOutcome> {
        let file = self.lock()?;
        let existing: Vec<NewsRecord> = file.read()?;
        let (merged, added) =
            merge_records(existing, incoming, self.cutoff(now), self.max_records);
        file.write(&merged)?;
        tracing::debug!(added, stored = merged.len(), "news cache upsert");
        Ok(UpsertOutcome {
            added,
            stored: merged.len(),
        })
    }

    pub fn query(&self, q: &NewsQuery) -> Result<Vec<NewsRecord>> {
        self.query_at(q, Utc::now())
    }

    /// Filter, apply the retention window, rank, limit.
    pub fn query_at(&self, q: &NewsQuery, now: DateTime<Utc>) -> Result<Vec<NewsRecord>> {
        let cutoff = self.cutoff(now);
        let items: Vec<NewsRecord> = self.lock()?.read()?;
        let needle = q
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut out: Vec<NewsRecord> = items
            .into_iter()
            .filter(|r| q.category.map_or(true, |c| r.category == c))
            .filter(|r| needle.as_deref().map_or(true, |n| r.matches_search(n)))
            .filter(|r| r.published_at >= cutoff)
            .collect();
        rank(&mut out);
        if let Some(limit) = q.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    /// Ranked, in-window records still waiting for classification.
    pub fn pending(&self, limit: usize) -> Result<Vec<NewsRecord>> {
        let mut out = self.query(&NewsQuery::default())?;
        out.retain(NewsRecord::is_pending);
        out.truncate(limit);
        Ok(out)
    }

    /// Write classifier annotations back by id. Only pending records are
    /// touched; returns how many were updated.
    pub fn apply_classifications(&self, updates: &[Classification]) -> Result<usize> {
        if updates.is_empty() {
            return Ok(0);
        }
        let by_id: HashMap<&str, &Classification> =
            updates.iter().map(|u| (u.id.as_str(), u)).collect();

        let file = self.lock()?;
        let mut items: Vec<NewsRecord> = file.read()?;
        let mut applied = 0usize;
        for item in items.iter_mut().filter(|r| r.is_pending()) {
            let Some(u) = by_id.get(item.id.as_str()) else {
                continue;
            };
            let summary = u.ai_summary.trim();
            if summary.is_empty() {
                continue;
            }
            if let Some(c) = u.category {
                item.category = c;
            }
            if let Some(urg) = u.urgency {
                item.urgency = urg;
            }
            item.ai_summary = Some(summary.to_string());
            applied += 1;
        }
        file.write(&items)?;
        Ok(applied)
    }

    /// Raw number of stored records, ignoring the window.
    pub fn stored_count(&self) -> Result<usize> {
        let items: Vec<NewsRecord> = self.lock()?.read()?;
        Ok(items.len())
    }
}
