// src/llm/mod.rs
//! LLM collaborators: intent parsing and article summaries.
//!
//! A [`ChatProvider`] does the raw remote call; [`LlmIntentParser`] and
//! [`LlmSummarizer`] turn it into the two narrow capabilities the services
//! consume. Failures are returned as errors; callers own the fallbacks.

pub mod openai;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::models::IntentResponse;
use openai::OpenAiCompatProvider;

/// What a chat call is for; lets the mock provider answer sensibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPurpose {
    Intent,
    Summary,
}

#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub purpose: ChatPurpose,
    pub model: &'a str,
    pub system: &'a str,
    pub user: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Low-level provider: one remote chat completion.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, req: &ChatRequest<'_>) -> anyhow::Result<String>;
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait IntentParser: Send + Sync {
    /// Classify `query`. An error means "use the search fallback".
    async fn parse_intent(&self, query: &str) -> anyhow::Result<IntentResponse>;
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// One-sentence summary of `text`. An error means "use the sentinel".
    async fn summarize(&self, article_id: &str, text: &str) -> anyhow::Result<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynIntentParser = Arc<dyn IntentParser>;
pub type DynSummarizer = Arc<dyn Summarizer>;

pub struct LlmIntentParser {
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl LlmIntentParser {
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl IntentParser for LlmIntentParser {
    async fn parse_intent(&self, query: &str) -> anyhow::Result<IntentResponse> {
        let req = ChatRequest {
            purpose: ChatPurpose::Intent,
            model: &self.model,
            system: prompts::INTENT_SYSTEM,
            user: query,
            temperature: 0.0,
            max_tokens: 200,
        };
        let content = self.provider.complete(&req).await?;
        IntentResponse::from_model_output(&content, query)
            .ok_or_else(|| anyhow::anyhow!("{}: intent output is not a JSON object", self.provider.name()))
    }
}

pub struct LlmSummarizer {
    provider: Arc<dyn ChatProvider>,
    model: String,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn ChatProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, _article_id: &str, text: &str) -> anyhow::Result<String> {
        let req = ChatRequest {
            purpose: ChatPurpose::Summary,
            model: &self.model,
            system: prompts::SUMMARY_SYSTEM,
            user: text,
            temperature: 0.3,
            max_tokens: 100,
        };
        let raw = self.provider.complete(&req).await?;
        let cleaned = sanitize_summary(&raw);
        if cleaned.is_empty() {
            anyhow::bail!("{}: empty summary", self.provider.name());
        }
        Ok(cleaned)
    }

    fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

/// Always fails; used when no provider is configured.
pub struct DisabledProvider;

#[async_trait]
impl ChatProvider for DisabledProvider {
    async fn complete(&self, _req: &ChatRequest<'_>) -> anyhow::Result<String> {
        anyhow::bail!("llm disabled")
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic offline provider (`LLM_TEST_MODE=mock`).
pub struct MockProvider;

#[async_trait]
impl ChatProvider for MockProvider {
    async fn complete(&self, req: &ChatRequest<'_>) -> anyhow::Result<String> {
        Ok(match req.purpose {
            ChatPurpose::Intent => serde_json::json!({
                "intent": "search",
                "entities": { "query": req.user.trim() }
            })
            .to_string(),
            ChatPurpose::Summary => {
                let head: String = req.user.chars().take(120).collect();
                format!("Summary (mock): {}", head.trim())
            }
        })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Collapse to a single trimmed line, capped at 400 chars.
pub fn sanitize_summary(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(400));
    let mut prev_space = false;
    for ch in input.chars() {
        let c = if ch.is_whitespace() { ' ' } else { ch };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
        if out.chars().count() >= 400 {
            break;
        }
    }
    out.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

/// Intent parser and summarizer sharing one provider.
#[derive(Clone)]
pub struct LlmClients {
    pub intent: DynIntentParser,
    pub summarizer: DynSummarizer,
    pub provider_name: &'static str,
}

impl LlmClients {
    pub fn from_provider(provider: Arc<dyn ChatProvider>, cfg: &LlmConfig) -> Self {
        let provider_name = provider.name();
        Self {
            intent: Arc::new(LlmIntentParser::new(provider.clone(), cfg.intent_model.clone())),
            summarizer: Arc::new(LlmSummarizer::new(provider, cfg.summary_model.clone())),
            provider_name,
        }
    }

    pub fn disabled() -> Self {
        Self::from_provider(Arc::new(DisabledProvider), &LlmConfig::default())
    }
}

/// Factory: build clients according to config and environment variables.
///
/// * If `LLM_TEST_MODE=mock`, returns deterministic mock clients.
/// * Else if `config.enabled == false` or no key, returns disabled clients.
/// * Else builds the OpenAI-compatible provider for the configured backend.
pub fn build_clients(config: &LlmConfig) -> anyhow::Result<LlmClients> {
    if std::env::var("LLM_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(LlmClients::from_provider(Arc::new(MockProvider), config));
    }

    if !config.enabled || config.api_key.trim().is_empty() {
        return Ok(LlmClients::disabled());
    }

    let name = match config.provider.as_str() {
        "openai" => "openai",
        _ => "groq",
    };
    let provider = OpenAiCompatProvider::new(name, config.resolved_base_url(), &config.api_key)?;
    Ok(LlmClients::from_provider(Arc::new(provider), config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Intent;

    struct Canned(&'static str);

    #[async_trait]
    impl ChatProvider for Canned {
        async fn complete(&self, _req: &ChatRequest<'_>) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
        fn name(&self) -> &'static str {
            "canned"
        }
    }

    #[tokio::test]
    async fn intent_parser_reads_fenced_json() {
        let p = LlmIntentParser::new(
            Arc::new(Canned("```json\n{\"intent\":\"category\",\"entities\":{\"category\":\"Sports\"}}\n```")),
            "m",
        );
        let r = p.parse_intent("sports news").await.unwrap();
        assert_eq!(r.intent, Intent::Category);
        assert_eq!(r.entities.category_text(), Some("Sports"));
        assert_eq!(r.entities.query_text(), Some("sports news"));
    }

    #[tokio::test]
    async fn intent_parser_errors_on_prose() {
        let p = LlmIntentParser::new(Arc::new(Canned("I think you want sports.")), "m");
        assert!(p.parse_intent("sports").await.is_err());
    }

    #[tokio::test]
    async fn disabled_provider_fails_both_capabilities() {
        let c = LlmClients::disabled();
        assert!(c.intent.parse_intent("q").await.is_err());
        assert!(c.summarizer.summarize("a", "some text").await.is_err());
        assert_eq!(c.provider_name, "disabled");
    }

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let c = LlmClients::from_provider(Arc::new(MockProvider), &LlmConfig::default());
        let r = c.intent.parse_intent("  climate  ").await.unwrap();
        assert_eq!(r.intent, Intent::Search);
        assert_eq!(r.entities.query_text(), Some("climate"));
        let s1 = c.summarizer.summarize("a", "Rates rise again").await.unwrap();
        let s2 = c.summarizer.summarize("a", "Rates rise again").await.unwrap();
        assert_eq!(s1, s2);
    }

    #[test]
    fn sanitize_collapses_and_unquotes() {
        assert_eq!(
            sanitize_summary("  \"Fed holds\n\trates steady.\"  "),
            "Fed holds rates steady."
        );
        assert!(sanitize_summary(&"x ".repeat(1000)).chars().count() <= 400);
    }
}
