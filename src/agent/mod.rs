//! # Analyst agent
//! Bounded tool-calling loop over a conversation, grounded in the news cache,
//! the latest briefing, the company's cash positions and (optionally) filing
//! data.
//!
//! States: `AwaitingModel -> TerminalText | DispatchingTools -> AwaitingModel
//! ... -> TurnExhausted`. Every tool invocation gets exactly one result, and
//! all results of a turn go back to the model as one user message. Running
//! out of turns is an error; there is no partial answer.

pub mod context;
pub mod tools;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::llm::{ContentBlock, DynModel, Message, ModelRequest, ModelResponse, Role, StopReason};
use crate::store::{BriefingCache, NewsCache, NewsQuery};
use context::{build_system_prompt, ChatContext, CONTEXT_NEWS_LIMIT};
use tools::ToolDispatcher;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("conversation has no messages")]
    EmptyConversation,
    #[error("model ended the turn without any text")]
    MissingFinalText,
    #[error("chat exceeded maximum tool-use turns ({turns})")]
    TurnBudgetExhausted { turns: u32 },
    #[error("model call failed: {0:#}")]
    Model(anyhow::Error),
    #[error("could not assemble chat context: {0:#}")]
    Context(anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct AgentConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    /// Round-trips allowed when only the search tool is declared.
    pub max_turns: u32,
    /// Round-trips allowed when the financial-data tool is declared too.
    pub max_turns_with_financials: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1200,
            temperature: 0.5,
            max_turns: 4,
            max_turns_with_financials: 5,
        }
    }
}

impl AgentConfig {
    pub fn turn_budget(&self, with_financials: bool) -> u32 {
        if with_financials {
            self.max_turns_with_financials
        } else {
            self.max_turns
        }
    }
}

/// One prior message as sent by the chat UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

enum LoopState {
    AwaitingModel { turn: u32 },
    DispatchingTools { turn: u32, response: ModelResponse },
    TerminalText(ModelResponse),
    TurnExhausted { turns: u32 },
}

pub struct AnalystAgent {
    model: DynModel,
    news: Arc<NewsCache>,
    briefings: Arc<BriefingCache>,
    tools: ToolDispatcher,
    config: AgentConfig,
}

impl AnalystAgent {
    pub fn new(
        model: DynModel,
        news: Arc<NewsCache>,
        briefings: Arc<BriefingCache>,
        tools: ToolDispatcher,
        config: AgentConfig,
    ) -> Self {
        Self {
            model,
            news,
            briefings,
            tools,
            config,
        }
    }

    /// Cache reads run on the blocking pool.
    pub async fn context(&self) -> Result<ChatContext, AgentError> {
        let news = Arc::clone(&self.news);
        let briefings = Arc::clone(&self.briefings);
        let (news, briefing) = tokio::task::spawn_blocking(move || {
            Ok::<_, anyhow::Error>((
                news.query(&NewsQuery::limit(CONTEXT_NEWS_LIMIT))?,
                briefings.latest()?,
            ))
        })
        .await
        .map_err(|e| AgentError::Context(anyhow::anyhow!("context task failed: {e}")))?
        .map_err(AgentError::Context)?;
        Ok(ChatContext {
            news,
            briefing,
            company_block: self.tools.company_block(),
            financials_tool: self.tools.has_financials(),
        })
    }

    /// Answer the last user message given the whole conversation.
    pub async fn chat(&self, history: &[ChatMessage]) -> Result<String, AgentError> {
        if history.is_empty() {
            return Err(AgentError::EmptyConversation);
        }
        let system = build_system_prompt(&self.context().await?);
        let messages = history
            .iter()
            .map(|m| Message {
                role: m.role,
                content: vec![ContentBlock::text(m.content.clone())],
            })
            .collect();
        let out = self.run_loop(system, messages).await;
        if let Err(e) = &out {
            let reason = match e {
                AgentError::MissingFinalText => "no_text",
                AgentError::TurnBudgetExhausted { .. } => "turn_budget",
                AgentError::Model(_) => "model",
                _ => "other",
            };
            counter!("agent_failures_total", "reason" => reason).increment(1);
            tracing::warn!(error = %e, reason, "chat failed");
        }
        out
    }

    /// Drive the model until it answers in text or the turn budget runs out.
    pub async fn run_loop(
        &self,
        system: String,
        mut conversation: Vec<Message>,
    ) -> Result<String, AgentError> {
        let specs = self.tools.specs();
        let budget = self.config.turn_budget(self.tools.has_financials());
        let mut state = LoopState::AwaitingModel { turn: 1 };

        loop {
            state = match state {
                LoopState::AwaitingModel { turn } if turn > budget => {
                    LoopState::TurnExhausted { turns: budget }
                }
                LoopState::AwaitingModel { turn } => {
                    let req = ModelRequest::new(
                        conversation.clone(),
                        self.config.max_tokens,
                        self.config.temperature,
                    )
                    .with_system(system.clone())
                    .with_tools(specs.clone());
                    let response = self.model.complete(req).await.map_err(AgentError::Model)?;
                    tracing::debug!(turn, stop = ?response.stop_reason, blocks = response.content.len(), "model turn");
                    conversation.push(Message {
                        role: Role::Assistant,
                        content: response.content.clone(),
                    });
                    let wants_tools = response.stop_reason == StopReason::ToolUse
                        && response
                            .content
                            .iter()
                            .any(|b| matches!(b, ContentBlock::ToolUse { .. }));
                    if wants_tools {
                        LoopState::DispatchingTools { turn, response }
                    } else {
                        histogram!("agent_turns").record(f64::from(turn));
                        LoopState::TerminalText(response)
                    }
                }
                LoopState::DispatchingTools { turn, response } => {
                    let mut results = Vec::new();
                    for block in &response.content {
                        if let ContentBlock::ToolUse { id, name, input } = block {
                            results.push(self.tools.resolve(id, name, input).await);
                        }
                    }
                    conversation.push(Message {
                        role: Role::User,
                        content: results,
                    });
                    LoopState::AwaitingModel { turn: turn + 1 }
                }
                LoopState::TerminalText(response) => {
                    return response
                        .first_text()
                        .map(str::to_string)
                        .ok_or(AgentError::MissingFinalText);
                }
                LoopState::TurnExhausted { turns } => {
                    histogram!("agent_turns").record(f64::from(turns));
                    return Err(AgentError::TurnBudgetExhausted { turns });
                }
            };
        }
    }
}
