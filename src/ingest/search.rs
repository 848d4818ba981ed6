//! Backend for the `search_financial_news` tool.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::agent::tools::NewsSearch;
use crate::ingest::providers::RssFeedProvider;
use crate::ingest::sources::{search_url, Source, GOOGLE_NEWS_RSS, SEARCH_FEED_LIMIT};
use crate::ingest::normalize_entry;
use crate::ingest::types::SourceProvider;
use crate::news::{Category, NewsRecord};
use crate::store::{NewsCache, NewsQuery};

pub const MAX_RESULTS: usize = 8;

/// Search tool backend: a live Google News query plus matching cached records.
pub struct LiveNewsSearch {
    client: reqwest::Client,
    cache: Arc<NewsCache>,
    base_url: String,
}

impl LiveNewsSearch {
    pub fn new(client: reqwest::Client, cache: Arc<NewsCache>) -> Self {
        Self {
            client,
            cache,
            base_url: GOOGLE_NEWS_RSS.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    async fn fetch_live(&self, query: &str) -> Result<Vec<NewsRecord>> {
        let source = Source {
            name: "Google News".to_string(),
            url: search_url(&self.base_url, query)?,
            category: Category::General,
            limit: SEARCH_FEED_LIMIT,
        };
        let provider = RssFeedProvider::http(source, self.client.clone());
        let now = Utc::now();
        Ok(provider
            .fetch_latest()
            .await?
            .into_iter()
            .map(|e| normalize_entry(e, provider.name(), Category::General, now))
            .collect())
    }
}

/// `• title (source, Mon d, yyyy) — url`, one per line.
pub fn format_results(records: &[NewsRecord]) -> String {
    let mut out = String::new();
    for r in records {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(
            out,
            "• {} ({}, {}) — {}",
            r.title,
            r.source_name,
            r.published_at.format("%b %-d, %Y"),
            r.source_url
        );
    }
    out
}

#[async_trait]
impl NewsSearch for LiveNewsSearch {
    async fn search(&self, query: &str) -> Result<String> {
        let live = self.fetch_live(query).await;
        let cached = self.cache.query(&NewsQuery {
            search: Some(query.to_string()),
            limit: Some(MAX_RESULTS),
            ..NewsQuery::default()
        })?;

        let live = match live {
            Ok(v) => v,
            Err(e) if cached.is_empty() => return Err(e),
            Err(e) => {
                tracing::warn!(error = ?e, "live search failed; answering from cache");
                Vec::new()
            }
        };

        let mut seen = HashSet::new();
        let merged: Vec<NewsRecord> = live
            .into_iter()
            .chain(cached)
            .filter(|r| !r.source_url.is_empty() && seen.insert(r.source_url.clone()))
            .take(MAX_RESULTS)
            .collect();

        if merged.is_empty() {
            return Ok(format!("No recent news found for \"{}\".", query.trim()));
        }
        Ok(format_results(&merged))
    }
}
