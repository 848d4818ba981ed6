//! System prompt assembly for the analyst chat.

use std::fmt::Write as _;

use crate::cash::{format_cash_summary, CASH_BY_BANK, CASH_BY_COUNTRY};
use crate::news::{Briefing, NewsRecord};

pub const CONTEXT_NEWS_LIMIT: usize = 150;
pub const NO_BRIEFING: &str = "No daily briefing has been generated yet for today.";
pub const NO_NEWS: &str = "No news items loaded yet. Ask the user to run a news refresh.";

const ASSISTANT_PROMPT: &str = "You are the Treasury Intelligence Assistant for a Fortune 500 company.
You have access to today's financial news feed, the daily executive briefing, and the company's current cash position data.
Answer questions from the Treasury team with precision and actionable insights.

Company context:
- Cash by country and banking counterparty data is provided below
- You are speaking to Treasury professionals who understand financial terminology

Guidelines:
- Be concise and direct; these are busy executives
- Ground answers in the provided news and briefing context when relevant
- If you need more current information on a topic, use the search_financial_news tool
- Flag any risks you identify even if not directly asked
- Format key figures and risks in **bold** for scannability
- Reference specific articles or briefing points when answering questions about them";

const FINANCIALS_HINT: &str = "- For reported figures of any public company (debt, maturities, cash flow), use the lookup_company_financials tool";

/// Everything the chat system prompt is assembled from.
#[derive(Debug, Clone, Default)]
pub struct ChatContext {
    pub news: Vec<NewsRecord>,
    pub briefing: Option<Briefing>,
    pub company_block: Option<String>,
    pub financials_tool: bool,
}

/// `• [category | U#] title — summary` per record.
pub fn news_lines(records: &[NewsRecord]) -> String {
    if records.is_empty() {
        return NO_NEWS.to_string();
    }
    let mut out = String::new();
    for r in records {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "• [{} | U{}] {}", r.category, r.urgency, r.title);
        if let Some(s) = &r.ai_summary {
            let _ = write!(out, " — {s}");
        }
    }
    out
}

fn briefing_block(b: Option<&Briefing>) -> String {
    match b {
        Some(b) => format!(
            "--- TODAY'S EXECUTIVE BRIEFING ({}, generated {} UTC) ---\n{}\n--- END BRIEFING ---",
            b.date,
            b.generated_at.format("%H:%M"),
            b.content
        ),
        None => NO_BRIEFING.to_string(),
    }
}

pub fn build_system_prompt(ctx: &ChatContext) -> String {
    let mut out = String::from(ASSISTANT_PROMPT);
    if ctx.financials_tool {
        out.push('\n');
        out.push_str(FINANCIALS_HINT);
    }
    let _ = write!(
        out,
        "\n\n--- COMPANY CASH POSITIONS ---\n{}\n",
        format_cash_summary(CASH_BY_COUNTRY, CASH_BY_BANK)
    );
    if let Some(block) = &ctx.company_block {
        let _ = write!(out, "\n--- COMPANY FINANCIALS ---\n{block}\n");
    }
    let _ = write!(
        out,
        "\n--- TODAY'S NEWS FEED ({} articles) ---\n{}\n\n{}\n--- END CONTEXT ---",
        ctx.news.len(),
        news_lines(&ctx.news),
        briefing_block(ctx.briefing.as_ref())
    );
    out
}
