//! Deterministic model clients for tests and `AI_TEST_MODE=mock`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use super::{ModelClient, ModelRequest, ModelResponse};

/// Replays a fixed queue of responses (or errors) and records every request.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Result<ModelResponse, String>>>,
    seen: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::with_results(responses.into_iter().map(Ok).collect())
    }

    /// `Err(msg)` entries make that call fail with `msg`.
    pub fn with_results(script: Vec<Result<ModelResponse, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.seen.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ModelClient for ScriptedModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(request);
        }
        let next = self
            .script
            .lock()
            .map_err(|_| anyhow!("script lock poisoned"))?
            .pop_front();
        match next {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(msg)) => Err(anyhow!(msg)),
            None => Err(anyhow!("scripted model exhausted")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

type Responder = dyn Fn(&ModelRequest) -> Result<ModelResponse> + Send + Sync;

/// Computes each response from the request.
pub struct FnModel {
    f: Box<Responder>,
}

impl FnModel {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<ModelResponse> + Send + Sync + 'static,
    {
        Self { f: Box::new(f) }
    }

    /// Canned behaviour for `AI_TEST_MODE=mock`: echoes every id in a
    /// classification prompt as a `general` / urgency 3 annotation, answers
    /// everything else with a fixed sentence.
    pub fn offline() -> Self {
        Self::new(|req| {
            let prompt = req
                .messages
                .last()
                .and_then(|m| m.first_text())
                .unwrap_or_default();
            if let Some(items) = prompt
                .find("\n[")
                .and_then(|i| serde_json::from_str::<Vec<serde_json::Value>>(&prompt[i + 1..]).ok())
            {
                let out: Vec<serde_json::Value> = items
                    .iter()
                    .filter_map(|it| it.get("id").cloned())
                    .map(|id| {
                        serde_json::json!({
                            "id": id,
                            "category": "general",
                            "urgency": 3,
                            "aiSummary": "Offline classification (mock)."
                        })
                    })
                    .collect();
                return Ok(ModelResponse::text(serde_json::Value::Array(out).to_string()));
            }
            Ok(ModelResponse::text("Neutral treasury outlook (mock)."))
        })
    }
}

#[async_trait]
impl ModelClient for FnModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse> {
        (self.f)(&request)
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}
