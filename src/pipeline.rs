//! One refresh: fetch every source, save raw records, classify what is
//! pending. Raw records are persisted before any model call so a classifier
//! outage never loses fetched news.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::classify::{ClassificationPipeline, ClassifyReport};
use crate::ingest::types::SourceOutcome;
use crate::ingest::IngestEngine;
use crate::store::NewsCache;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub fetched: usize,
    pub added: usize,
    pub analyzed: usize,
    pub sources_failed: usize,
    pub source_outcomes: Vec<SourceOutcome>,
    pub classify: ClassifyReport,
    pub timestamp: DateTime<Utc>,
}

pub struct RefreshPipeline {
    engine: Arc<IngestEngine>,
    cache: Arc<NewsCache>,
    classifier: Arc<ClassificationPipeline>,
}

impl RefreshPipeline {
    pub fn new(
        engine: Arc<IngestEngine>,
        cache: Arc<NewsCache>,
        classifier: Arc<ClassificationPipeline>,
    ) -> Self {
        Self {
            engine,
            cache,
            classifier,
        }
    }

    /// Nothing fetched means nothing is written or classified.
    pub async fn run_once(&self) -> Result<RefreshReport> {
        let report = self.engine.fetch_all().await;
        let fetched = report.records.len();
        let sources_failed = report.failed_sources();

        let mut out = RefreshReport {
            fetched,
            added: 0,
            analyzed: 0,
            sources_failed,
            source_outcomes: report.outcomes,
            classify: ClassifyReport::default(),
            timestamp: Utc::now(),
        };
        if fetched == 0 {
            tracing::warn!(sources_failed, "refresh fetched nothing");
            return Ok(out);
        }

        let cache = Arc::clone(&self.cache);
        let records = report.records;
        out.added = tokio::task::spawn_blocking(move || cache.upsert(records))
            .await
            .context("news upsert task")??
            .added;
        out.classify = self.classifier.run().await?;
        out.analyzed = out.classify.applied;
        out.timestamp = Utc::now();

        tracing::info!(
            fetched,
            added = out.added,
            analyzed = out.analyzed,
            sources_failed,
            "refresh complete"
        );
        Ok(out)
    }
}
