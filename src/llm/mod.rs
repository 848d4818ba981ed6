//! # Model client
//! Provider-neutral request/response types for a tool-capable chat model, the
//! `ModelClient` seam, and two convenience calls used by the batch pipelines.
//!
//! Content is a list of typed blocks (`text`, `tool_use`, `tool_result`), and
//! every response carries the stop condition so the agent loop can tell a
//! final answer from a tool request.

pub mod anthropic;
pub mod mock;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use anthropic::AnthropicClient;
pub use mock::{FnModel, ScriptedModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        status: ToolStatus,
    },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// First text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }
}

/// A tool the model may call; `input_schema` is a JSON Schema object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub system: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolSpec>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ModelRequest {
    pub fn new(messages: Vec<Message>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            system: None,
            messages,
            tools: Vec::new(),
            max_tokens,
            temperature,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    Other,
}

impl StopReason {
    pub fn from_wire(s: Option<&str>) -> Self {
        match s {
            Some("end_turn") => StopReason::EndTurn,
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
}

impl ModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentBlock::text(text)],
            stop_reason: StopReason::EndTurn,
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ContentBlock::as_text)
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse>;
    /// Provider name for logs and diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynModel = Arc<dyn ModelClient>;

/// Returned when the model is switched off in config.
pub struct DisabledModel;

#[async_trait]
impl ModelClient for DisabledModel {
    async fn complete(&self, _request: ModelRequest) -> Result<ModelResponse> {
        Err(anyhow!("model client disabled"))
    }

    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// One call, first text block back.
pub async fn complete_text(model: &dyn ModelClient, request: ModelRequest) -> Result<String> {
    let resp = model.complete(request).await?;
    resp.first_text()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("{} returned no text", model.provider_name()))
}

/// One call, body parsed as JSON after stripping markdown fences.
pub async fn complete_json<T: DeserializeOwned>(
    model: &dyn ModelClient,
    request: ModelRequest,
) -> Result<T> {
    let raw = complete_text(model, request).await?;
    let body = strip_code_fences(&raw);
    serde_json::from_str(body).with_context(|| {
        let head: String = body.chars().take(120).collect();
        format!("model output is not the expected JSON: {head}")
    })
}

/// "```json\n[...]\n```" -> "[...]". Unfenced text is only trimmed.
pub fn strip_code_fences(s: &str) -> &str {
    let t = s.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let rest = match rest.find('\n') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
