//! # Ingestion
//! Parallel fetch across every registered source, normalization into
//! provisional records and URL dedup.

pub mod config;
pub mod providers;
pub mod scheduler;
pub mod search;
pub mod sources;
pub mod types;

use crate::ingest::types::{FetchStatus, RawEntry, SourceOutcome, SourceProvider};
use crate::news::{Category, NewsRecord, Urgency};
use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DESCRIPTION_MAX_CHARS: usize = 400;
pub const UNTITLED: &str = "Untitled";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(12);

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_sources_total", "Sources polled by fetch_all.");
        describe_counter!(
            "ingest_source_failures_total",
            "Sources that failed or timed out."
        );
        describe_counter!(
            "ingest_records_total",
            "Records kept after normalization and URL dedup."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Records dropped as duplicate or URL-less."
        );
        describe_histogram!("ingest_fetch_ms", "Per-source fetch time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when fetch_all last completed."
        );
    });
}

/// Plain-text description: tags out, core entities decoded, whitespace folded, capped.
pub fn clean_description(html: &str) -> String {
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"<[^>]+>").unwrap());
    let mut out = re_tags.replace_all(html, " ").to_string();

    out = out
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > DESCRIPTION_MAX_CHARS {
        out = out.chars().take(DESCRIPTION_MAX_CHARS).collect();
    }
    out
}

/// Dedup key for a link: trimmed, fragment dropped. `None` when nothing usable remains.
pub fn canonical_url(raw: &str) -> Option<String> {
    let t = raw.trim();
    let t = t.split_once('#').map(|(head, _)| head).unwrap_or(t);
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

/// Parse RFC 2822 (RSS `pubDate`) or RFC 3339 (Atom / ISO) timestamps.
pub fn parse_published(ts: &str) -> Option<DateTime<Utc>> {
    use time::format_description::well_known::Rfc2822;
    use time::OffsetDateTime;

    let ts = ts.trim();
    if let Ok(dt) = OffsetDateTime::parse(ts, &Rfc2822) {
        return DateTime::from_timestamp(dt.unix_timestamp(), 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Turn one raw entry into a provisional record (urgency 3, source category).
/// A missing link yields an empty `source_url`; `dedup_by_url` discards those.
pub fn normalize_entry(
    raw: RawEntry,
    source_name: &str,
    category: Category,
    fetched_at: DateTime<Utc>,
) -> NewsRecord {
    let title = raw
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();
    let description = clean_description(raw.description.as_deref().unwrap_or_default());
    let source_url = raw
        .link
        .as_deref()
        .and_then(canonical_url)
        .unwrap_or_default();
    let published_at = raw
        .published
        .as_deref()
        .and_then(parse_published)
        .unwrap_or(fetched_at);

    NewsRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title,
        description,
        source_url,
        source_name: source_name.to_string(),
        published_at,
        fetched_at,
        category,
        urgency: Urgency::default(),
        ai_summary: None,
    }
}

/// First occurrence of each URL wins; URL-less records are dropped.
/// Returns (kept, dropped_count).
pub fn dedup_by_url(records: Vec<NewsRecord>) -> (Vec<NewsRecord>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for r in records {
        if r.source_url.is_empty() || !seen.insert(r.source_url.clone()) {
            dropped += 1;
            continue;
        }
        kept.push(r);
    }
    (kept, dropped)
}

/// Result of one `fetch_all`: merged records plus a per-source outcome.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub records: Vec<NewsRecord>,
    pub outcomes: Vec<SourceOutcome>,
}

impl IngestReport {
    pub fn failed_sources(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }
}

/// Fans out to every registered source and merges the survivors.
pub struct IngestEngine {
    sources: Vec<Arc<dyn SourceProvider>>,
    timeout: Duration,
}

impl IngestEngine {
    pub fn new(sources: Vec<Arc<dyn SourceProvider>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Fetch every source concurrently, wait for all to settle, normalize and dedup.
    /// Source failures never surface here; they show up in `outcomes` only.
    pub async fn fetch_all(&self) -> IngestReport {
        ensure_metrics_described();

        let fetches = self.sources.iter().map(|p| {
            let p = Arc::clone(p);
            let timeout = self.timeout;
            async move {
                let t0 = Instant::now();
                let res = tokio::time::timeout(timeout, p.fetch_latest()).await;
                histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                (p, res)
            }
        });
        let settled = futures::future::join_all(fetches).await;

        let fetched_at = Utc::now();
        let mut merged = Vec::new();
        let mut outcomes = Vec::with_capacity(settled.len());

        for (p, res) in settled {
            counter!("ingest_sources_total").increment(1);
            let status = match res {
                Ok(Ok(entries)) => {
                    let n = entries.len();
                    merged.extend(entries.into_iter().map(|e| {
                        normalize_entry(e, p.name(), p.default_category(), fetched_at)
                    }));
                    FetchStatus::Fetched { entries: n }
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = ?e, source = p.name(), "source fetch failed");
                    counter!("ingest_source_failures_total", "reason" => "error").increment(1);
                    FetchStatus::Failed {
                        error: format!("{e:#}"),
                    }
                }
                Err(_) => {
                    let after_ms = self.timeout.as_millis() as u64;
                    tracing::warn!(source = p.name(), after_ms, "source fetch timed out");
                    counter!("ingest_source_failures_total", "reason" => "timeout").increment(1);
                    FetchStatus::TimedOut { after_ms }
                }
            };
            outcomes.push(SourceOutcome {
                source: p.name().to_string(),
                status,
            });
        }

        let (records, dropped) = dedup_by_url(merged);

        counter!("ingest_records_total").increment(records.len() as u64);
        counter!("ingest_dedup_total").increment(dropped as u64);
        gauge!("ingest_pipeline_last_run_ts").set(fetched_at.timestamp() as f64);

        tracing::info!(
            target: "ingest",
            sources = outcomes.len(),
            failed = outcomes.iter().filter(|o| o.is_failure()).count(),
            kept = records.len(),
            dropped,
            "fetch_all settled"
        );

        IngestReport { records, outcomes }
    }
}
