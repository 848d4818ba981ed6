//! Anthropic Messages API client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ContentBlock, ModelClient, ModelRequest, ModelResponse, StopReason, ToolStatus};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API over reqwest. No retries; one request per call.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("treasury-intel/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building model http client")?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn to_api_request(&self, request: ModelRequest) -> ApiRequest {
        let tools: Vec<ApiToolDef> = request
            .tools
            .into_iter()
            .map(|t| ApiToolDef {
                name: t.name,
                description: t.description,
                input_schema: t.input_schema,
            })
            .collect();

        let messages = request
            .messages
            .into_iter()
            .map(|m| {
                let blocks: Vec<serde_json::Value> = m.content.iter().map(block_to_wire).collect();
                ApiMessage {
                    role: m.role.as_str().to_string(),
                    content: serde_json::Value::Array(blocks),
                }
            })
            .collect();

        ApiRequest {
            model: self.model.clone(),
            system: request.system,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages,
            tools: if tools.is_empty() { None } else { Some(tools) },
        }
    }
}

fn block_to_wire(b: &ContentBlock) -> serde_json::Value {
    match b {
        ContentBlock::Text { text } => serde_json::json!({"type": "text", "text": text}),
        ContentBlock::ToolUse { id, name, input } => {
            serde_json::json!({"type": "tool_use", "id": id, "name": name, "input": input})
        }
        ContentBlock::ToolResult {
            tool_use_id,
            content,
            status,
        } => serde_json::json!({
            "type": "tool_result",
            "tool_use_id": tool_use_id,
            "content": content,
            "is_error": *status == ToolStatus::Error,
        }),
    }
}

#[async_trait]
impl ModelClient for AnthropicClient {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let payload = self.to_api_request(request);

        let resp = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow!("anthropic api error (timeout): {e}")
                } else {
                    anyhow!("anthropic api error (transport): {e}")
                }
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            let text = resp.text().await.unwrap_or_default();
            let parsed = serde_json::from_str::<ApiError>(&text).ok();
            return Err(format_api_error(status, parsed));
        }

        let body: ApiResponse = resp.json().await.context("decoding anthropic response")?;
        let content = body
            .content
            .into_iter()
            .filter_map(|block| match block.block_type.as_str() {
                "text" => block.text.map(|text| ContentBlock::Text { text }),
                "tool_use" => Some(ContentBlock::ToolUse {
                    id: block.id?,
                    name: block.name?,
                    input: block
                        .input
                        .unwrap_or(serde_json::Value::Object(Default::default())),
                }),
                _ => None,
            })
            .collect();

        Ok(ModelResponse {
            content,
            stop_reason: StopReason::from_wire(body.stop_reason.as_deref()),
        })
    }

    fn provider_name(&self) -> &'static str {
        "anthropic"
    }
}

fn format_api_error(status: StatusCode, parsed: Option<ApiError>) -> anyhow::Error {
    match parsed {
        Some(e) => anyhow!(
            "anthropic api error ({status}): {} ({})",
            e.error.message,
            e.error.kind
        ),
        None => anyhow!("anthropic api error ({status})"),
    }
}

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ApiToolDef>>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ApiToolDef {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}
