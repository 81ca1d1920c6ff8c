// src/config/llm.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_LLM_CONFIG_PATH: &str = "config/llm.json";
pub const ENV_LLM_CONFIG_PATH: &str = "LLM_CONFIG_PATH";

pub const DEFAULT_INTENT_MODEL: &str = "llama-3.3-70b-versatile";
pub const DEFAULT_SUMMARY_MODEL: &str = "llama-3.1-8b-instant";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn default_intent_model() -> String {
    DEFAULT_INTENT_MODEL.to_string()
}
fn default_summary_model() -> String {
    DEFAULT_SUMMARY_MODEL.to_string()
}
fn default_provider() -> String {
    "groq".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub enabled: bool,
    /// "groq" | "openai" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    /// "ENV" means: read from GROQ_API_KEY / OPENAI_API_KEY (by provider)
    #[serde(default)]
    pub api_key: String,
    /// Overrides the provider's default endpoint root.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_intent_model")]
    pub intent_model: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_provider(),
            api_key: String::new(),
            base_url: None,
            intent_model: default_intent_model(),
            summary_model: default_summary_model(),
        }
    }
}

impl LlmConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: LlmConfig = serde_json::from_str(data)?;

        cfg.provider = cfg.provider.trim().to_lowercase();
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            let var = key_env_var(&cfg.provider)?;
            cfg.api_key =
                env::var(var).map_err(|_| anyhow::anyhow!("Missing {var} env var"))?;
        }
        if cfg.intent_model.trim().is_empty() {
            cfg.intent_model = default_intent_model();
        }
        if cfg.summary_model.trim().is_empty() {
            cfg.summary_model = default_summary_model();
        }
        Ok(cfg)
    }

    /// `LLM_CONFIG_PATH` (or `config/llm.json`) when readable, otherwise built
    /// from `GROQ_API_KEY` / `OPENAI_API_KEY`. No key at all → disabled.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = env::var(ENV_LLM_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_LLM_CONFIG_PATH.into());
        if Path::new(&path).exists() {
            return Self::load_from_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load llm config at {path}: {e}"));
        }

        let mut cfg = Self::default();
        for provider in ["groq", "openai"] {
            let var = key_env_var(provider)?;
            if let Some(key) = env::var(var).ok().filter(|k| !k.trim().is_empty()) {
                cfg.enabled = true;
                cfg.provider = provider.to_string();
                cfg.api_key = key;
                break;
            }
        }
        if let Ok(m) = env::var("INTENT_MODEL") {
            if !m.trim().is_empty() {
                cfg.intent_model = m;
            }
        }
        if let Ok(m) = env::var("SUMMARY_MODEL") {
            if !m.trim().is_empty() {
                cfg.summary_model = m;
            }
        }
        Ok(cfg)
    }

    pub fn resolved_base_url(&self) -> &str {
        match self.base_url.as_deref() {
            Some(u) if !u.trim().is_empty() => u.trim_end_matches('/'),
            _ if self.provider == "openai" => OPENAI_BASE_URL,
            _ => GROQ_BASE_URL,
        }
    }
}

fn key_env_var(provider: &str) -> anyhow::Result<&'static str> {
    match provider {
        "groq" => Ok("GROQ_API_KEY"),
        "openai" => Ok("OPENAI_API_KEY"),
        other => anyhow::bail!("Unsupported provider in config: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = LlmConfig::from_json_str(r#"{"enabled": true, "api_key": "k"}"#).unwrap();
        assert_eq!(cfg.provider, "groq");
        assert_eq!(cfg.intent_model, DEFAULT_INTENT_MODEL);
        assert_eq!(cfg.summary_model, DEFAULT_SUMMARY_MODEL);
        assert_eq!(cfg.resolved_base_url(), GROQ_BASE_URL);
    }

    #[test]
    fn provider_is_normalized_and_picks_base_url() {
        let cfg =
            LlmConfig::from_json_str(r#"{"enabled": true, "provider": " OpenAI ", "api_key": "k"}"#)
                .unwrap();
        assert_eq!(cfg.provider, "openai");
        assert_eq!(cfg.resolved_base_url(), OPENAI_BASE_URL);
    }

    #[test]
    fn explicit_base_url_wins_and_loses_trailing_slash() {
        let cfg = LlmConfig::from_json_str(
            r#"{"enabled": true, "api_key": "k", "base_url": "http://localhost:9999/v1/"}"#,
        )
        .unwrap();
        assert_eq!(cfg.resolved_base_url(), "http://localhost:9999/v1");
    }

    #[test]
    fn unknown_provider_with_env_key_is_rejected() {
        let err = LlmConfig::from_json_str(r#"{"provider": "claude", "api_key": "ENV"}"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("Unsupported provider"));
    }
}
