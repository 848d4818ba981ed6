// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use treasury_intel::ingest::types::{RawEntry, SourceProvider};
use treasury_intel::news::{Category, NewsRecord, Urgency};
use treasury_intel::store::{FixedRetention, NewsCache};

pub fn record(url: &str, published_at: DateTime<Utc>, urgency: u8) -> NewsRecord {
    NewsRecord {
        id: format!("id-{url}"),
        title: format!("Headline for {url}"),
        description: "Body text".to_string(),
        source_url: url.to_string(),
        source_name: "Test Wire".to_string(),
        published_at,
        fetched_at: published_at,
        category: Category::General,
        urgency: Urgency::new(urgency).expect("urgency in range"),
        ai_summary: None,
    }
}

pub fn hours_ago(now: DateTime<Utc>, h: i64) -> DateTime<Utc> {
    now - Duration::hours(h)
}

pub fn cache_in(dir: &std::path::Path, days: u32) -> Arc<NewsCache> {
    Arc::new(NewsCache::in_dir(dir, Arc::new(FixedRetention(days))))
}

/// Provider returning canned entries, an error, or sleeping past any deadline.
pub enum StubProvider {
    Entries(&'static str, Vec<RawEntry>),
    Fails(&'static str),
    Hangs(&'static str),
}

pub fn entry(title: &str, link: &str) -> RawEntry {
    RawEntry {
        title: Some(title.to_string()),
        link: Some(link.to_string()),
        description: Some(format!("<b>{title}</b>")),
        published: Some("Tue, 10 Jun 2025 14:30:00 GMT".to_string()),
    }
}

#[async_trait]
impl SourceProvider for StubProvider {
    async fn fetch_latest(&self) -> anyhow::Result<Vec<RawEntry>> {
        match self {
            StubProvider::Entries(_, v) => Ok(v.clone()),
            StubProvider::Fails(_) => Err(anyhow::anyhow!("connection refused")),
            StubProvider::Hangs(_) => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &str {
        match self {
            StubProvider::Entries(n, _) | StubProvider::Fails(n) | StubProvider::Hangs(n) => n,
        }
    }

    fn default_category(&self) -> Category {
        Category::Macro
    }
}
