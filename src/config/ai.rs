//! Model provider settings and the client factory.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use std::{env, fs, path::Path};

use crate::llm::anthropic::{AnthropicClient, DEFAULT_BASE_URL};
use crate::llm::{DisabledModel, DynModel, FnModel};

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    60
}

/// Model settings loaded from `config/ai.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    pub enabled: bool,
    /// Only "anthropic" is wired (case-insensitive).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from ANTHROPIC_API_KEY
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            model: default_model(),
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut cfg: AiConfig = serde_json::from_str(&data)?;

        cfg.provider = cfg.provider.to_lowercase();

        // Resolve api key if "ENV" (or left blank)
        let key = cfg.api_key.trim();
        if key.is_empty() || key.eq_ignore_ascii_case("env") {
            cfg.api_key = match cfg.provider.as_str() {
                "anthropic" => env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }

        if cfg.timeout_secs == 0 {
            cfg.timeout_secs = default_timeout_secs();
        }
        Ok(cfg)
    }

    /// Missing file means "disabled"; a malformed one is logged and also disables.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = ?e, path = %path.display(), "ai config unusable; model disabled");
                Self::default()
            }
        }
    }
}

/// Factory: build a model client according to config and environment.
///
/// * `AI_TEST_MODE=mock` gives the deterministic offline model.
/// * `enabled == false` or no api key gives a disabled client.
/// * Otherwise the Anthropic client.
pub fn build_client_from_config(config: &AiConfig) -> DynModel {
    if env::var("AI_TEST_MODE").map(|v| v == "mock").unwrap_or(false) {
        return Arc::new(FnModel::offline());
    }
    if !config.enabled {
        return Arc::new(DisabledModel);
    }
    if config.provider != "anthropic" {
        tracing::warn!(provider = %config.provider, "unsupported model provider; model disabled");
        return Arc::new(DisabledModel);
    }
    if config.api_key.is_empty() {
        tracing::warn!("ANTHROPIC_API_KEY missing; model disabled");
        return Arc::new(DisabledModel);
    }
    match AnthropicClient::new(
        config.api_key.clone(),
        config.base_url.clone(),
        config.model.clone(),
        Duration::from_secs(config.timeout_secs),
    ) {
        Ok(c) => {
            tracing::info!(model = %config.model, key_len = config.api_key.len(), "model client ready");
            Arc::new(c)
        }
        Err(e) => {
            tracing::warn!(error = ?e, "model client build failed; model disabled");
            Arc::new(DisabledModel)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn env_key_is_resolved_and_defaults_fill_in() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("ai.json");
        fs::write(&p, r#"{"enabled":true,"provider":"Anthropic","api_key":"ENV"}"#).unwrap();

        env::set_var("ANTHROPIC_API_KEY", "sk-test");
        let cfg = AiConfig::load_from_file(&p).unwrap();
        env::remove_var("ANTHROPIC_API_KEY");

        assert_eq!(cfg.provider, "anthropic");
        assert_eq!(cfg.api_key, "sk-test");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.timeout_secs, 60);
    }

    #[serial_test::serial]
    #[test]
    fn mock_mode_and_disabled_paths() {
        env::set_var("AI_TEST_MODE", "mock");
        assert_eq!(build_client_from_config(&AiConfig::default()).provider_name(), "mock");
        env::remove_var("AI_TEST_MODE");

        assert_eq!(
            build_client_from_config(&AiConfig::default()).provider_name(),
            "disabled"
        );
        let keyless = AiConfig {
            enabled: true,
            ..AiConfig::default()
        };
        assert_eq!(build_client_from_config(&keyless).provider_name(), "disabled");
    }

    #[test]
    fn missing_file_is_disabled() {
        let cfg = AiConfig::load_or_default("definitely/not/here.json");
        assert!(!cfg.enabled);
    }
}
