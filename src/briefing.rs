//! Daily executive briefing: cached per calendar date, generated on demand
//! from the highest-priority records in the news cache.

use chrono::{NaiveDate, Utc};
use metrics::counter;
use std::fmt::Write as _;
use std::sync::Arc;
use thiserror::Error;

use crate::llm::{complete_text, DynModel, Message, ModelRequest};
use crate::news::{Briefing, NewsRecord};
use crate::store::{BriefingCache, NewsCache, NewsQuery};

pub const SOURCE_RECORDS: usize = 50;
pub const DIGEST_RECORDS: usize = 40;
pub const MAX_TOKENS: u32 = 1500;
pub const TEMPERATURE: f32 = 0.4;

const SYSTEM_PROMPT: &str = "You are the Chief Treasury Officer's senior intelligence advisor at a Fortune 500 company.
Write concise, actionable daily briefings for a corporate Treasurer.
Focus on: liquidity risk, counterparty risk, FX/rate exposure, capital markets, credit, and geopolitical risk.
Tone: Senior executive briefing, direct, no filler, high signal-to-noise ratio.
Format responses in clean Markdown.";

const TEMPLATE: &str = "Structure it exactly as follows:

## Executive Summary
2-3 sentences capturing the single most important Treasury insight today.

## Critical Alerts
Bullet points for any urgency-4 or urgency-5 items requiring immediate attention. If none, write \"No critical alerts today.\"

## Market & Rate Environment
Key developments in rates, FX, and capital markets relevant to Treasury operations.

## Risk Signals
- **Counterparty/Banking**: Any news about financial institutions
- **Liquidity**: Funding market conditions, credit spreads
- **Geopolitical**: Regional risks affecting treasury operations

## Key Themes Today
3-5 numbered themes from today's news landscape.

## Watch List
2-3 forward-looking items to monitor in the coming days.";

#[derive(Debug, Error)]
pub enum BriefingError {
    #[error("no news items available; run a news refresh first")]
    NoSourceData,
    #[error("briefing generation failed: {0:#}")]
    Model(anyhow::Error),
    #[error("briefing store error: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Numbered digest lines: `N. [CATEGORY | Urgency U] title` + summary or description.
pub fn build_digest(records: &[NewsRecord]) -> String {
    let mut out = String::new();
    for (i, r) in records.iter().take(DIGEST_RECORDS).enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let detail = r.ai_summary.as_deref().unwrap_or(&r.description);
        let _ = write!(
            out,
            "{}. [{} | Urgency {}] {}\n   {}",
            i + 1,
            r.category.as_str().to_uppercase(),
            r.urgency,
            r.title,
            detail
        );
    }
    out
}

pub fn build_prompt(date: NaiveDate, records: &[NewsRecord]) -> String {
    format!(
        "Today is {}.\n\nBased on today's financial news, write the daily Treasury Intelligence Briefing.\n\n{TEMPLATE}\n\n---\nToday's news feed ({} items):\n\n{}",
        date.format("%A, %B %-d, %Y"),
        records.len(),
        build_digest(records)
    )
}

pub struct BriefingService {
    model: DynModel,
    news: Arc<NewsCache>,
    briefings: Arc<BriefingCache>,
}

impl BriefingService {
    pub fn new(model: DynModel, news: Arc<NewsCache>, briefings: Arc<BriefingCache>) -> Self {
        Self {
            model,
            news,
            briefings,
        }
    }

    pub async fn today(&self, force: bool) -> Result<Briefing, BriefingError> {
        self.get_or_generate(Utc::now().date_naive(), force).await
    }

    /// Cached briefing for `date` unless `force`; otherwise one model call
    /// over the top records, persisted under `date`.
    pub async fn get_or_generate(
        &self,
        date: NaiveDate,
        force: bool,
    ) -> Result<Briefing, BriefingError> {
        if !force {
            if let Some(cached) = self.briefings.get(date)? {
                return Ok(cached);
            }
        }

        let records = self.news.query(&NewsQuery::limit(SOURCE_RECORDS))?;
        if records.is_empty() {
            return Err(BriefingError::NoSourceData);
        }

        let req = ModelRequest::new(
            vec![Message::user(build_prompt(date, &records))],
            MAX_TOKENS,
            TEMPERATURE,
        )
        .with_system(SYSTEM_PROMPT);
        let content = complete_text(self.model.as_ref(), req)
            .await
            .map_err(BriefingError::Model)?;

        let briefing = Briefing {
            date,
            content,
            generated_at: Utc::now(),
        };
        self.briefings.upsert(briefing.clone())?;
        counter!("briefing_generated_total").increment(1);
        tracing::info!(%date, records = records.len(), force, "briefing generated");
        Ok(briefing)
    }
}
