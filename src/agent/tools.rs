//! Tool declarations, typed tool calls and the dispatcher that resolves them.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::FutureExt;
use metrics::counter;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::company::{DataType, FinancialsLookup};
use crate::llm::{ContentBlock, ToolSpec, ToolStatus};

pub const SEARCH_TOOL: &str = "search_financial_news";
pub const FINANCIALS_TOOL: &str = "lookup_company_financials";
pub const TOOL_NOT_AVAILABLE: &str = "Tool not available.";

/// Collaborator behind `search_financial_news`.
#[async_trait]
pub trait NewsSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<String>;
}

pub fn search_tool_spec() -> ToolSpec {
    ToolSpec {
        name: SEARCH_TOOL.to_string(),
        description: "Search for recent financial news on a specific topic to supplement the current intelligence feed. Use this when the question requires information not covered in today's feed or briefing.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query for financial news, be specific (e.g. \"Federal Reserve rate decision\", \"Deutsche Bank counterparty risk\")"
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

pub fn financials_tool_spec() -> ToolSpec {
    let kinds: Vec<&str> = DataType::ALL.iter().map(DataType::as_str).collect();
    ToolSpec {
        name: FINANCIALS_TOOL.to_string(),
        description: "Look up reported financials (balance sheet, debt maturities, income statement, cash flow) for a public company by ticker or name.".to_string(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "company": {
                    "type": "string",
                    "description": "Ticker symbol or company name, e.g. \"GEHC\" or \"Siemens Healthineers\""
                },
                "data_type": {
                    "type": "string",
                    "enum": kinds,
                    "description": "Which section of the filing data to return"
                }
            },
            "required": ["company", "data_type"],
            "additionalProperties": false
        }),
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FinancialsArgs {
    company: String,
    data_type: DataType,
}

/// A tool invocation that passed schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    SearchNews { query: String },
    CompanyFinancials { company: String, data_type: DataType },
}

impl ToolCall {
    /// `Ok(None)` for a tool name we do not know.
    pub fn parse(name: &str, input: &serde_json::Value) -> Result<Option<Self>> {
        match name {
            SEARCH_TOOL => {
                let a: SearchArgs = serde_json::from_value(input.clone())
                    .map_err(|e| anyhow!("invalid input for {SEARCH_TOOL}: {e}"))?;
                if a.query.trim().is_empty() {
                    return Err(anyhow!("invalid input for {SEARCH_TOOL}: empty query"));
                }
                Ok(Some(ToolCall::SearchNews { query: a.query }))
            }
            FINANCIALS_TOOL => {
                let a: FinancialsArgs = serde_json::from_value(input.clone())
                    .map_err(|e| anyhow!("invalid input for {FINANCIALS_TOOL}: {e}"))?;
                if a.company.trim().is_empty() {
                    return Err(anyhow!("invalid input for {FINANCIALS_TOOL}: empty company"));
                }
                Ok(Some(ToolCall::CompanyFinancials {
                    company: a.company,
                    data_type: a.data_type,
                }))
            }
            _ => Ok(None),
        }
    }
}

/// Short stable fingerprint for logging user-supplied text.
pub fn query_fingerprint(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

/// Resolves tool-use blocks into tool-result blocks.
#[derive(Clone)]
pub struct ToolDispatcher {
    search: Arc<dyn NewsSearch>,
    financials: Option<Arc<dyn FinancialsLookup>>,
}

impl ToolDispatcher {
    pub fn new(search: Arc<dyn NewsSearch>, financials: Option<Arc<dyn FinancialsLookup>>) -> Self {
        Self { search, financials }
    }

    pub fn has_financials(&self) -> bool {
        self.financials.is_some()
    }

    pub fn company_block(&self) -> Option<String> {
        self.financials.as_ref().and_then(|f| f.context_block())
    }

    /// Declarations sent with every model request.
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut v = vec![search_tool_spec()];
        if self.financials.is_some() {
            v.push(financials_tool_spec());
        }
        v
    }

    async fn run(&self, call: ToolCall) -> (String, ToolStatus) {
        match call {
            ToolCall::SearchNews { query } => {
                tracing::info!(tool = SEARCH_TOOL, query_hash = %query_fingerprint(&query), "tool call");
                match self.search.search(&query).await {
                    Ok(text) => (text, ToolStatus::Success),
                    Err(e) => (format!("Search failed: {e:#}"), ToolStatus::Error),
                }
            }
            ToolCall::CompanyFinancials { company, data_type } => match &self.financials {
                Some(f) => {
                    tracing::info!(tool = FINANCIALS_TOOL, data_type = data_type.as_str(), company_hash = %query_fingerprint(&company), "tool call");
                    (f.lookup(&company, data_type).await, ToolStatus::Success)
                }
                None => (TOOL_NOT_AVAILABLE.to_string(), ToolStatus::Error),
            },
        }
    }

    /// Exactly one result per invocation. Errors and panics inside a tool
    /// become an error result; nothing escapes.
    pub async fn resolve(&self, id: &str, name: &str, input: &serde_json::Value) -> ContentBlock {
        counter!("agent_tool_calls_total", "tool" => name.to_string()).increment(1);
        let (content, status) = match ToolCall::parse(name, input) {
            Ok(Some(call)) => match AssertUnwindSafe(self.run(call)).catch_unwind().await {
                Ok(out) => out,
                Err(_) => {
                    tracing::error!(tool = name, "tool panicked");
                    (format!("Tool {name} failed unexpectedly."), ToolStatus::Error)
                }
            },
            Ok(None) => {
                tracing::warn!(tool = name, "model asked for an undeclared tool");
                (TOOL_NOT_AVAILABLE.to_string(), ToolStatus::Error)
            }
            Err(e) => (format!("{e:#}"), ToolStatus::Error),
        };
        ContentBlock::ToolResult {
            tool_use_id: id.to_string(),
            content,
            status,
        }
    }
}
