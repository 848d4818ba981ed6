//! # Classification pipeline
//! Annotates pending records with a treasury category, an urgency score and a
//! one-to-two sentence summary.
//!
//! Work is split into batches of 20 and run strictly one after another; each
//! batch's annotations are written to the cache before the next starts. A
//! batch that fails (transport error, malformed JSON) is logged and skipped;
//! the rest still run and its records simply stay pending for the next
//! refresh.

use anyhow::{Context, Result};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::llm::{complete_json, DynModel, Message, ModelRequest};
use crate::news::{Category, Classification, NewsRecord, Urgency};
use crate::store::NewsCache;

pub const MAX_PENDING: usize = 80;
pub const BATCH_SIZE: usize = 20;
pub const DESCRIPTION_PROMPT_CHARS: usize = 200;
pub const MAX_TOKENS: u32 = 4096;
pub const TEMPERATURE: f32 = 0.1;

const SYSTEM_PROMPT: &str = "You are a senior Treasury analyst at a Fortune 500 company.
Analyze financial news items and classify each for a corporate Treasury executive dashboard.

Treasury categories:
- liquidity: cash management, money markets, funding, short-term borrowing
- capital-markets: bonds, debt issuance, equity, IPO, credit facilities
- fx-rates: foreign exchange, currency moves, interest rates, central bank policy
- credit-ratings: rating agency actions, downgrades, upgrades, credit outlook
- ma: mergers, acquisitions, divestitures, deal activity
- risk: counterparty risk, bank risk, systemic risk, insurance
- macro: GDP, inflation, employment, broad market moves, recession signals
- pensions: pension funds, defined benefit, retirement assets
- geopolitical: sanctions, political risk, regional instability, trade policy
- general: other financial news

Urgency scale (Treasury impact):
5 = CRITICAL: Immediate action required (major bank failure, currency crisis, surprise rate move, sovereign default)
4 = HIGH: Significant risk signal (rating downgrade, >2% market move, major counterparty news, regional crisis)
3 = MEDIUM: Important to monitor (Fed meeting, key economic data, sector developments, deal announcements)
2 = LOW: Background awareness (general commentary, minor market moves, routine data)
1 = MINIMAL: Minimal Treasury relevance";

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("classify_batches_total", "Classification batches attempted.");
        describe_counter!(
            "classify_batch_failures_total",
            "Batches skipped after a model or parse failure."
        );
        describe_counter!(
            "classify_applied_total",
            "Records annotated and written back."
        );
    });
}

#[derive(Debug, Serialize)]
struct PromptItem<'a> {
    id: &'a str,
    title: &'a str,
    description: String,
}

/// One element of the model's JSON array. Loose on purpose: bad fields are
/// dropped per item, not per batch.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawAnnotation {
    id: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    urgency: Option<serde_json::Value>,
    #[serde(default)]
    ai_summary: Option<String>,
}

impl RawAnnotation {
    fn into_classification(self) -> Option<Classification> {
        let ai_summary = self.ai_summary?.trim().to_string();
        if ai_summary.is_empty() {
            return None;
        }
        let category = self.category.and_then(|c| c.parse::<Category>().ok());
        let urgency = self
            .urgency
            .and_then(|v| v.as_u64())
            .and_then(|n| u8::try_from(n).ok())
            .and_then(Urgency::new);
        Some(Classification {
            id: self.id,
            category,
            urgency,
            ai_summary,
        })
    }
}

pub fn build_prompt(batch: &[NewsRecord]) -> Result<String> {
    let input: Vec<PromptItem<'_>> = batch
        .iter()
        .map(|r| PromptItem {
            id: &r.id,
            title: &r.title,
            description: r.description.chars().take(DESCRIPTION_PROMPT_CHARS).collect(),
        })
        .collect();
    let json = serde_json::to_string_pretty(&input).context("serializing batch")?;
    Ok(format!(
        "Analyze these {n} news items and return a JSON array.

Each object must have exactly these fields:
- id: string (copy from input, do not change)
- category: one of: {cats}
- urgency: integer 1-5
- aiSummary: string, 1-2 sentences on Treasury implications

Return ONLY a valid JSON array. No markdown, no explanation.

News items:
{json}",
        n = batch.len(),
        cats = Category::ALL
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    ))
}

/// Counts from one `run` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyReport {
    pub selected: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub applied: usize,
}

pub struct ClassificationPipeline {
    model: DynModel,
    cache: Arc<NewsCache>,
}

impl ClassificationPipeline {
    pub fn new(model: DynModel, cache: Arc<NewsCache>) -> Self {
        Self { model, cache }
    }

    async fn classify_batch(&self, batch: &[NewsRecord]) -> Result<Vec<Classification>> {
        let prompt = build_prompt(batch)?;
        let req = ModelRequest::new(vec![Message::user(prompt)], MAX_TOKENS, TEMPERATURE)
            .with_system(SYSTEM_PROMPT);
        let raw: Vec<RawAnnotation> = complete_json(self.model.as_ref(), req).await?;
        Ok(raw
            .into_iter()
            .filter_map(RawAnnotation::into_classification)
            .collect())
    }

    /// Classify the given records; returns how many were written back.
    pub async fn classify(&self, pending: &[NewsRecord]) -> Result<ClassifyReport> {
        ensure_metrics_described();
        let selected = &pending[..pending.len().min(MAX_PENDING)];
        let mut report = ClassifyReport {
            selected: selected.len(),
            ..ClassifyReport::default()
        };
        for (i, batch) in selected.chunks(BATCH_SIZE).enumerate() {
            report.batches += 1;
            counter!("classify_batches_total").increment(1);
            match self.classify_batch(batch).await {
                Ok(got) => {
                    // written before the next batch starts
                    let applied = self.cache.apply_classifications(&got)?;
                    report.applied += applied;
                    counter!("classify_applied_total").increment(applied as u64);
                    tracing::debug!(batch = i + 1, items = batch.len(), annotated = got.len(), applied, "batch classified");
                }
                Err(e) => {
                    report.failed_batches += 1;
                    counter!("classify_batch_failures_total").increment(1);
                    tracing::warn!(error = ?e, batch = i + 1, provider = self.model.provider_name(), "classification batch failed");
                }
            }
        }

        tracing::info!(
            selected = report.selected,
            batches = report.batches,
            failed = report.failed_batches,
            applied = report.applied,
            "classification finished"
        );
        Ok(report)
    }

    /// Select up to 80 pending records from the cache and classify them.
    pub async fn run(&self) -> Result<ClassifyReport> {
        let pending = self.cache.pending(MAX_PENDING)?;
        if pending.is_empty() {
            return Ok(ClassifyReport::default());
        }
        self.classify(&pending).await
    }
}
