// src/llm/openai.rs
//! Chat Completions client for OpenAI-compatible endpoints (OpenAI, Groq).

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatProvider, ChatRequest};

pub struct OpenAiCompatProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    name: &'static str,
}

impl OpenAiCompatProvider {
    pub fn new(name: &'static str, base_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("geo-news/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            name,
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn complete(&self, req: &ChatRequest<'_>) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            anyhow::bail!("{}: missing api key", self.name);
        }

        let body = Req {
            model: req.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: req.system,
                },
                Msg {
                    role: "user",
                    content: req.user,
                },
            ],
            temperature: req.temperature,
            max_tokens: req.max_tokens,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{}: request failed", self.name))?;

        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("{}: upstream returned {}", self.name, status);
        }

        let parsed: Resp = resp
            .json()
            .await
            .with_context(|| format!("{}: malformed response body", self.name))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            anyhow::bail!("{}: empty completion", self.name);
        }
        Ok(content)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
